//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the quarry configuration file.

use crate::config::{load_config, ExportMode};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading validates as well
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Database: {}", config.database.name);
        println!(
            "  Host: {}",
            config.database.host.as_deref().unwrap_or("(client default)")
        );
        println!(
            "  Password: {}",
            if config.database.password.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("  Dump Command: {}", config.tools.dump_command);
        println!("  Client Command: {}", config.tools.client_command);
        println!("  Export Mode: {}", config.export.mode);
        println!("  Layout: {}", config.export.layout);
        println!("  Execution: {}", config.export.execution);
        println!("  Output Directory: {}", config.export.output_dir);
        println!("  Clause Budget: {} bytes", config.export.clause_budget);
        println!(
            "  Max Concurrent Tables: {}",
            config.export.max_concurrent_tables
        );
        if config.export.mode == ExportMode::Filtered {
            println!(
                "  Selection Manifest: {}",
                config
                    .catalog
                    .selection_manifest
                    .as_deref()
                    .unwrap_or_default()
            );
        }
        if !config.catalog.exclude_tables.is_empty() {
            println!("  Excluded Tables: {:?}", config.catalog.exclude_tables);
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nname = \"lush\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_validate_filtered_without_manifest() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nname = \"lush\"\n\n[export]\nmode = \"filtered\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
