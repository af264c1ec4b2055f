//! HemoLink server library.
//!
//! Coordinates blood donors, hospitals and blood requests: hospitals open
//! requests, a matching pass proposes eligible donors, matches walk a
//! fixed lifecycle, and completed donations land in an append-only
//! history ledger.

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod features;
pub mod middleware;
