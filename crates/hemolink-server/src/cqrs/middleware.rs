//! Marker traits separating the write side from the read side.
//!
//! Handlers are plain functions; these markers exist so a request type
//! states which side it belongs to and reviewers can tell at a glance.

/// A request that changes state. One handler per command.
pub trait Command {}

/// A request that only reads. Queries must not write.
pub trait Query {}
