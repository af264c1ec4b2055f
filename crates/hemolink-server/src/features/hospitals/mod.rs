//! Hospital directory.

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::register::RegisterHospital;
pub use commands::update::UpdateHospital;
pub use queries::get::GetHospital;
pub use queries::list::ListHospitals;
pub use routes::hospital_routes;
