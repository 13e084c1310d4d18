//! AeriaLink Common Library
//!
//! Domain types and the side-effect free parts of the Connections page
//! validator: stratified account sampling, coverage planning, and the
//! pagination/sort arithmetic the UI checks are built on.

pub mod coverage;
pub mod error;
pub mod pagination;
pub mod sampling;
pub mod types;

// Re-export commonly used types
pub use coverage::{build_plan, ConnectionSelectionPolicy, CoveragePlan, PlanEntry};
pub use error::{Error, Result};
pub use pagination::{PaginationSummary, SortCheck};
pub use sampling::{select_accounts, SamplingBucket};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
