//! Blood requests and their lifecycle.
//!
//! Requests are raised by hospitals (or by admins on their behalf), walk
//! pending -> matched -> fulfilled, and can be cancelled while open.
//! Creating a request immediately runs a matching pass; fulfilled requests
//! age out through the retention purge.

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::cancel::CancelBloodRequest;
pub use commands::create::CreateBloodRequest;
pub use commands::decide::{DecideBloodRequest, RequestDecision};
pub use commands::purge_expired::PurgeExpiredRequests;
pub use commands::rematch::RematchBloodRequest;
pub use queries::get::GetBloodRequest;
pub use queries::list::ListBloodRequests;
pub use routes::{request_routes, RequestsState};
