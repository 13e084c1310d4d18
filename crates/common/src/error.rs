//! Error types for the pure validation layer

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting validator inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid exhaustive factor: {0}% (expected 1-100)")]
    InvalidExhaustiveFactor(u32),

    #[error("Unexpected pagination summary format: \"{0}\"")]
    SummaryFormat(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(u64),
}
