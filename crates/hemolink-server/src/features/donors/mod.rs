//! Donor registry: registration, profile upkeep, availability and
//! contact sharing.

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::register::RegisterDonor;
pub use commands::set_availability::SetDonorAvailability;
pub use commands::update_profile::UpdateDonorProfile;
pub use queries::contact::GetDonorContact;
pub use queries::get::GetDonor;
pub use queries::list::ListDonors;
pub use routes::donor_routes;
