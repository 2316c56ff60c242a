//! Domain models and types for quarry.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Validated identifiers** ([`TableName`], [`DatabaseName`])
//! - **Row selection** ([`TableSpec`], [`TableSelection`], [`Predicate`])
//! - **Error types** ([`QuarryError`], [`DumpError`])
//! - **Result type alias** ([`Result`])
//!
//! # Row selection
//!
//! ```rust
//! use quarry::domain::{Predicate, TableName, TableSpec};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = TableSpec::filtered(
//!     TableName::new("track_artist_rel")?,
//!     vec![Predicate::new([("track_id", 10i64), ("artist_id", 4437i64)])?],
//! );
//! assert_eq!(
//!     spec.predicates().unwrap()[0].conjunction(),
//!     "`track_id`=10 and `artist_id`=4437"
//! );
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod table;

// Re-export commonly used types for convenience
pub use errors::{DumpError, QuarryError};
pub use ids::{DatabaseName, TableName};
pub use result::Result;
pub use table::{Predicate, PredicateValue, TableSelection, TableSpec};
