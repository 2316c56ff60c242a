//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "quarry.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing quarry configuration");
        println!();

        // Check if file already exists
        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        // Generate configuration content
        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        // Write to file
        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your database settings", self.output);
                println!("  2. Put the password in a .env file as QUARRY_DB_PASSWORD");
                println!("  3. For filtered exports, point [catalog] selection_manifest at your selection file");
                println!("  4. Validate configuration: quarry validate-config");
                println!("  5. Run export: quarry export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# quarry configuration file

[database]
name = "lush"
user = "backup"
password = "${QUARRY_DB_PASSWORD}"

[export]
mode = "full"
layout = "unified"
execution = "sequential"
output_dir = "./dump"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# quarry configuration file
#
# Every value can be overridden with QUARRY_<SECTION>_<KEY> environment
# variables, e.g. QUARRY_EXPORT_OUTPUT_DIR=/backups/today.
# ${VAR} references are substituted from the environment (and .env).

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Source Database
# ============================================================================
[database]
# Schema to export
name = "lush"

# Connection settings; omitted values fall back to the client defaults
host = "127.0.0.1"
port = 3306
user = "backup"

# Passed to the tools through MYSQL_PWD, never on the command line
password = "${QUARRY_DB_PASSWORD}"

# ============================================================================
# External Tools
# ============================================================================
[tools]
# Dump tool used for every phase
dump_command = "mysqldump"

# Client used to list tables
client_command = "mysql"

# Extra arguments appended to every dump invocation
extra_args = ["--single-transaction", "--skip-comments"]

# ============================================================================
# Export Settings
# ============================================================================
[export]
# whole    - one dump of structure, data and routines
# full     - structure, every table, routines
# filtered - like full, restricted to the rows in the selection manifest
mode = "full"

# unified - a single dump.sql
# split   - one numbered file per phase and table
layout = "unified"

# sequential - one dump process at a time
# concurrent - structure, tables and routines at once
execution = "sequential"

# Created when missing
output_dir = "./dump"

# Maximum length in bytes of one WHERE clause
clause_budget = 12800

# Tables dumped at once in concurrent mode
max_concurrent_tables = 8

# ============================================================================
# Catalog
# ============================================================================
[catalog]
# JSON file with per-table row predicates, required for mode = "filtered"
# selection_manifest = "selection.json"

# Tables left out of every export
exclude_tables = ["track_language_rel"]

# ============================================================================
# Logging
# ============================================================================
[logging]
# Rotating JSON log files
local_enabled = true
local_path = "/var/log/quarry"
local_rotation = "daily"  # daily | hourly | never
local_max_files = 14       # rotated files kept
"#
        .to_string()
    }
}
