pub mod register;
pub mod set_availability;
pub mod update_profile;
