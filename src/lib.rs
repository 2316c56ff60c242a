// Quarry - Selective SQL export tool
// Copyright (c) 2025 Quarry Contributors
// Licensed under the MIT License

//! # Quarry - Selective SQL export
//!
//! Quarry produces replayable SQL exports of a MySQL database, either in
//! full or restricted to a row subset chosen by a selection manifest.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Batching** per-row predicates into size-bounded `WHERE` clauses
//! - **Dumping** each batch through `mysqldump` as one fragment
//! - **Stitching** fragments so every table keeps exactly one
//!   `LOCK TABLES` / `UNLOCK TABLES` bracket
//! - **Orchestrating** structure, table and routine phases sequentially or
//!   concurrently, into one file or one file per unit
//!
//! ## Architecture
//!
//! Quarry follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export orchestration
//! - [`adapters`] - External integrations (`mysqldump`, `mysql`)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//! use quarry::core::export::ExportOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("quarry.toml")?;
//!     let orchestrator = ExportOrchestrator::from_config(&config)?;
//!
//!     let summary = orchestrator.execute_export().await?;
//!
//!     println!("Dumped {} tables", summary.tables_succeeded);
//!     Ok(())
//! }
//! ```
//!
//! ## Predicate Batching
//!
//! ```rust
//! use quarry::core::export::batch_clauses;
//! use quarry::domain::Predicate;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let predicates = vec![
//!     Predicate::new([("id", 1i64)])?,
//!     Predicate::new([("id", 2i64)])?,
//! ];
//! assert_eq!(batch_clauses(&predicates, 12_800), ["`id`=1 or `id`=2"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Quarry uses the [`domain::QuarryError`] type for all errors. Failures of
//! individual export units never abort a run; they are collected in the
//! [`core::export::ExportSummary`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
