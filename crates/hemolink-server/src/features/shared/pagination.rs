//! Pagination for list queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Pagination parameters as they arrive from the query string.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    InvalidPage,

    #[error("per_page must be between 1 and {MAX_PER_PAGE}")]
    InvalidPerPage,
}

impl PaginationParams {
    /// Reject explicitly provided out-of-range values. Absent values fall
    /// back to defaults and are always fine.
    pub fn validate(&self) -> Result<(), PaginationError> {
        if let Some(page) = self.page {
            if page < 1 {
                return Err(PaginationError::InvalidPage);
            }
        }
        if let Some(per_page) = self.per_page {
            if !(1..=MAX_PER_PAGE).contains(&per_page) {
                return Err(PaginationError::InvalidPerPage);
            }
        }
        Ok(())
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

/// Pagination block included in list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMetadata {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1 && total > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let params = PaginationParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.page(), DEFAULT_PAGE);
        assert_eq!(params.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_computation() {
        let params = PaginationParams {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_validate_rejects_zero_page() {
        let params = PaginationParams {
            page: Some(0),
            per_page: None,
        };
        assert_eq!(params.validate(), Err(PaginationError::InvalidPage));
    }

    #[test]
    fn test_validate_rejects_oversized_per_page() {
        let params = PaginationParams {
            page: None,
            per_page: Some(MAX_PER_PAGE + 1),
        };
        assert_eq!(params.validate(), Err(PaginationError::InvalidPerPage));
    }

    #[test]
    fn test_metadata_page_count() {
        let meta = PaginationMetadata::new(1, 20, 45);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let last = PaginationMetadata::new(3, 20, 45);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_metadata_empty_result() {
        let meta = PaginationMetadata::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }
}
