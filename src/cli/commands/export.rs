//! Export command implementation
//!
//! This module implements the `export` command for dumping the configured
//! database to SQL files.

use crate::config::{read_config, ExecutionMode, ExportMode, OutputLayout, QuarryConfig};
use crate::core::export::{describe_output, ExportOrchestrator, ExportSummary};
use clap::Args;
use std::path::Path;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Override export mode (whole, full or filtered)
    #[arg(long)]
    pub mode: Option<String>,

    /// Export only the rows chosen by the selection manifest (same as --mode filtered)
    #[arg(long)]
    pub preview: bool,

    /// Write one file per phase and table instead of a single dump.sql
    #[arg(long)]
    pub split: bool,

    /// Run structure, tables and routines concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Override the selection manifest path
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<String>,

    /// Override the limit on tables dumped at once in concurrent mode
    #[arg(long, value_name = "N")]
    pub max_concurrent_tables: Option<usize>,
}

impl ExportArgs {
    /// Apply command-line overrides to the loaded configuration
    pub fn apply_overrides(&self, config: &mut QuarryConfig) -> Result<(), String> {
        if let Some(mode) = &self.mode {
            tracing::info!(mode = %mode, "Overriding export mode from CLI");
            config.export.mode = mode.parse::<ExportMode>()?;
        }

        if self.preview {
            tracing::info!("Preview requested, exporting selected rows only");
            config.export.mode = ExportMode::Filtered;
        }

        if self.split {
            config.export.layout = OutputLayout::Split;
        }

        if self.concurrent {
            config.export.execution = ExecutionMode::Concurrent;
        }

        if let Some(dir) = &self.output_dir {
            tracing::info!(output_dir = %dir, "Overriding output directory from CLI");
            config.export.output_dir = dir.clone();
        }

        if let Some(manifest) = &self.manifest {
            tracing::info!(manifest = %manifest, "Overriding selection manifest from CLI");
            config.catalog.selection_manifest = Some(manifest.clone());
        }

        if let Some(limit) = self.max_concurrent_tables {
            config.export.max_concurrent_tables = limit;
        }

        Ok(())
    }

    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        // Load configuration
        let mut config = match read_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Err(e) = self.apply_overrides(&mut config) {
            tracing::error!(error = %e, "Invalid command-line override");
            eprintln!("Invalid command-line override: {e}");
            return Ok(2);
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2); // Configuration error exit code
        }

        let orchestrator = match ExportOrchestrator::from_config(&config) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export orchestrator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(2);
            }
        };

        println!("🚀 Starting export of {}...", config.database.name);
        println!("  Mode: {}", config.export.mode);
        println!("  Layout: {}", config.export.layout);
        println!("  Execution: {}", config.export.execution);
        println!();

        let summary = match orchestrator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        summary.log_summary();
        print_summary(&summary, orchestrator.output_dir());

        let exit_code = if summary.is_successful() {
            println!("✅ Export completed successfully!");
            0
        } else {
            println!("⚠️  Export completed with failures");
            1 // Partial success
        };

        Ok(exit_code)
    }
}

fn print_summary(summary: &ExportSummary, output_dir: &Path) {
    println!();
    println!("📊 Export Summary:");
    println!("  Database: {}", summary.database);
    println!("  Started: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Output: {}", describe_output(output_dir, summary.layout).display());
    if summary.mode != ExportMode::Whole {
        println!("  Tables: {}", summary.total_tables);
        println!("  Succeeded: {}", summary.tables_succeeded);
        println!("  Failed: {}", summary.tables_failed);
    }
    println!("  Bytes Written: {}", summary.bytes_written());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.artifacts.is_empty() {
        println!("📁 Artifacts:");
        for artifact in &summary.artifacts {
            println!(
                "  - {} ({} bytes, sha256 {})",
                artifact.path.display(),
                artifact.bytes,
                artifact.sha256
            );
        }
        println!();
    }

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}
