pub mod cancel;
pub mod create;
pub mod decide;
pub mod purge_expired;
pub mod rematch;
