//! Donor matching and the match lifecycle.
//!
//! The matching pass proposes eligible donors for a request; matches then
//! walk pending -> contacted -> confirmed -> completed, with cancellation
//! possible from any open status. Completion is a separate operation
//! because it also writes the donation ledger.

pub mod commands;
pub mod matching;
pub mod queries;
pub mod routes;

pub use commands::complete::CompleteMatch;
pub use commands::transition::TransitionMatch;
pub use matching::run_matching_pass;
pub use queries::get::GetMatch;
pub use queries::list::ListMatches;
pub use routes::match_routes;
