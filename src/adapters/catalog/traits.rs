//! Catalog abstraction

use crate::domain::{Result, TableSpec};
use async_trait::async_trait;
use std::fmt;

/// Which tables and rows the catalog should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSelection {
    /// Every table, unfiltered
    Full,
    /// Tables restricted to the selected row subset
    Filtered,
}

impl fmt::Display for CatalogSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSelection::Full => f.write_str("full"),
            CatalogSelection::Filtered => f.write_str("filtered"),
        }
    }
}

/// Source of the ordered table list for a run
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the tables to export, in export order
    ///
    /// # Errors
    ///
    /// Returns an error if the table list or selection cannot be resolved.
    async fn fetch_tables(&self, selection: CatalogSelection) -> Result<Vec<TableSpec>>;
}
