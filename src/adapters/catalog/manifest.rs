//! Row selection manifest
//!
//! A JSON document listing, per table, the predicates that select the rows
//! to export:
//!
//! ```json
//! {
//!   "exclude": ["track_language_rel"],
//!   "tables": {
//!     "artist": [{"id": 4437}, {"id": 4438}],
//!     "track_artist_rel": [{"track_id": 10, "artist_id": 4437}]
//!   }
//! }
//! ```
//!
//! Tables absent from `tables` are exported in full. An empty predicate
//! list selects no rows.

use crate::domain::{Predicate, QuarryError, Result, TableName, TableSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Per-table row selection resolved outside quarry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionManifest {
    /// Tables left out of the export entirely
    #[serde(default)]
    pub exclude: Vec<TableName>,

    /// Predicates per restricted table
    #[serde(default)]
    pub tables: BTreeMap<TableName, Vec<Predicate>>,
}

impl SelectionManifest {
    /// Reads and parses a manifest file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            QuarryError::Catalog(format!(
                "Failed to read selection manifest {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents).map_err(|e| {
            QuarryError::Catalog(format!(
                "Invalid selection manifest {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parses manifest JSON
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Combines the schema's table list with this selection
    ///
    /// Schema order is kept. Manifest entries naming tables the schema does
    /// not have are skipped with a warning.
    pub fn apply(&self, schema_tables: Vec<TableName>) -> Vec<TableSpec> {
        let known: BTreeSet<&TableName> = schema_tables.iter().collect();
        for name in self.tables.keys().filter(|name| !known.contains(name)) {
            tracing::warn!(table = %name, "Selection manifest names a table missing from the schema");
        }

        schema_tables
            .into_iter()
            .filter(|name| !self.exclude.contains(name))
            .map(|name| match self.tables.get(&name) {
                Some(predicates) => TableSpec::filtered(name, predicates.clone()),
                None => TableSpec::unfiltered(name),
            })
            .collect()
    }
}
