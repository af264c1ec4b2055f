//! Helpers shared across feature slices.

pub mod error_helpers;
pub mod pagination;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;
