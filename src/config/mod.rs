//! Configuration management for quarry.
//!
//! quarry reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `QUARRY_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation before any export starts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! println!("Database: {}", config.database.name);
//! println!("Layout: {}", config.export.layout);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [database]
//! name = "lush"
//! user = "backup"
//! password = "${QUARRY_DB_PASSWORD}"
//!
//! [export]
//! mode = "filtered"
//! layout = "split"
//! execution = "concurrent"
//! output_dir = "./dump"
//!
//! [catalog]
//! selection_manifest = "selection.json"
//! exclude_tables = ["track_language_rel"]
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config, read_config};
pub use schema::{
    ApplicationConfig, CatalogConfig, DatabaseConfig, ExecutionMode, ExportConfig, ExportMode,
    LoggingConfig, OutputLayout, QuarryConfig, ToolsConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
