//! The donation history ledger.
//!
//! Rows are appended when a match completes and never change afterwards.
//! Statistics are derived from the ledger at read time.

pub mod ledger;
pub mod queries;
pub mod routes;

pub use ledger::{record_donation, NewDonationRecord};
pub use queries::list::ListDonations;
pub use queries::stats::GetDonorStats;
pub use routes::donation_routes;
