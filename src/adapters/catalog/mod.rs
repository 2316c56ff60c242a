//! Catalog service integration
//!
//! The catalog decides which tables, and which rows of them, a run exports.
//! [`MysqlCatalog`] lists tables from `information_schema` and, for
//! filtered runs, overlays a [`SelectionManifest`] produced by whatever
//! service resolved the row subset.

pub mod manifest;
pub mod mysql;
pub mod traits;

pub use manifest::SelectionManifest;
pub use mysql::MysqlCatalog;
pub use traits::{Catalog, CatalogSelection};
