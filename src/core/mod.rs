//! Core business logic for quarry.
//!
//! # Modules
//!
//! - [`export`] - Export orchestration, predicate batching, fragment
//!   stitching and artifact output
//!
//! # Export Workflow
//!
//! 1. **Prepare**: Create the output directory when missing
//! 2. **Catalog**: Fetch the table list, with row selections in filtered mode
//! 3. **Structure**: Dump schema definitions
//! 4. **Tables**: Dump each table's rows, one fragment per clause batch
//! 5. **Routines**: Dump stored routines
//! 6. **Report**: Generate the export summary
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//! use quarry::core::export::ExportOrchestrator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! let orchestrator = ExportOrchestrator::from_config(&config)?;
//!
//! let summary = orchestrator.execute_export().await?;
//!
//! println!("Tables: {}", summary.total_tables);
//! println!("Succeeded: {}", summary.tables_succeeded);
//! println!("Failed: {}", summary.tables_failed);
//! # Ok(())
//! # }
//! ```

pub mod export;
