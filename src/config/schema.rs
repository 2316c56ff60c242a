//! Configuration schema types
//!
//! This module defines the configuration structure for quarry.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a run exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// One dump invocation covering structure, data and routines
    Whole,
    /// Structure, every table in full, routines
    #[default]
    Full,
    /// Structure, catalog-filtered tables, routines
    Filtered,
}

/// How phase output is laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// Everything appended to a single `dump.sql`
    #[default]
    Unified,
    /// One numbered file per phase or table
    Split,
}

/// Whether phases and tables run one after another or concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

macro_rules! impl_lowercase_enum {
    ($ty:ident, $($variant:ident => $name:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(name)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!(
                        "Invalid value '{}'. Must be one of: {}",
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

impl_lowercase_enum!(ExportMode, Whole => "whole", Full => "full", Filtered => "filtered");
impl_lowercase_enum!(OutputLayout, Unified => "unified", Split => "split");
impl_lowercase_enum!(ExecutionMode, Sequential => "sequential", Concurrent => "concurrent");

/// Main quarry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Source database
    pub database: DatabaseConfig,

    /// External tool commands
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QuarryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.database.validate()?;
        self.tools.validate()?;
        self.export.validate()?;
        self.catalog.validate()?;
        self.logging.validate()?;

        if self.export.mode == ExportMode::Filtered && self.catalog.selection_manifest.is_none() {
            return Err(
                "catalog.selection_manifest is required when export.mode = 'filtered'".to_string(),
            );
        }

        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Source database connection settings, forwarded to the external tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Schema to export
    pub name: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    /// Passed to child processes as `MYSQL_PWD`, never on the command line
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        crate::domain::DatabaseName::new(self.name.as_str())
            .map_err(|e| format!("database.name: {e}"))?;

        if let Some(host) = &self.host {
            if host.trim().is_empty() {
                return Err("database.host cannot be empty when set".to_string());
            }
        }

        if self.port == Some(0) {
            return Err("database.port must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Dump command (mysqldump or a compatible binary)
    #[serde(default = "default_dump_command")]
    pub dump_command: String,

    /// SQL client command used to list tables
    #[serde(default = "default_client_command")]
    pub client_command: String,

    /// Extra arguments appended to every dump invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            dump_command: default_dump_command(),
            client_command: default_client_command(),
            extra_args: Vec::new(),
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.dump_command.trim().is_empty() {
            return Err("tools.dump_command cannot be empty".to_string());
        }
        if self.client_command.trim().is_empty() {
            return Err("tools.client_command cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export mode (whole, full or filtered)
    #[serde(default)]
    pub mode: ExportMode,

    /// Output layout (unified or split)
    #[serde(default)]
    pub layout: OutputLayout,

    /// Execution mode (sequential or concurrent)
    #[serde(default)]
    pub execution: ExecutionMode,

    /// Directory receiving the SQL artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum length in bytes of one `--where` clause
    #[serde(default = "default_clause_budget")]
    pub clause_budget: usize,

    /// Upper bound on tables exported at once in concurrent mode
    #[serde(default = "default_max_concurrent_tables")]
    pub max_concurrent_tables: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: ExportMode::default(),
            layout: OutputLayout::default(),
            execution: ExecutionMode::default(),
            output_dir: default_output_dir(),
            clause_budget: default_clause_budget(),
            max_concurrent_tables: default_max_concurrent_tables(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.output_dir.trim().is_empty() {
            return Err("export.output_dir cannot be empty".to_string());
        }
        if self.clause_budget == 0 {
            return Err("export.clause_budget must be greater than 0".to_string());
        }
        if self.max_concurrent_tables == 0 {
            return Err("export.max_concurrent_tables must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON selection manifest produced by the row-selection service
    #[serde(default)]
    pub selection_manifest: Option<String>,

    /// Tables never exported
    #[serde(default)]
    pub exclude_tables: Vec<String>,
}

impl CatalogConfig {
    fn validate(&self) -> Result<(), String> {
        for name in &self.exclude_tables {
            crate::domain::TableName::new(name.as_str())
                .map_err(|e| format!("catalog.exclude_tables: {e}"))?;
        }
        if let Some(path) = &self.selection_manifest {
            if path.trim().is_empty() {
                return Err("catalog.selection_manifest cannot be empty when set".to_string());
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation policy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Number of rotated log files kept; older ones are deleted
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err("local_path cannot be empty when local logging is enabled".to_string());
        }

        if self.local_max_files == 0 {
            return Err("local_max_files must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dump_command() -> String {
    "mysqldump".to_string()
}

fn default_client_command() -> String {
    "mysql".to_string()
}

fn default_output_dir() -> String {
    "./dump".to_string()
}

/// 256 bytes times 50 predicates, the clause size mysqldump handles comfortably
fn default_clause_budget() -> usize {
    256 * 50
}

fn default_max_concurrent_tables() -> usize {
    8
}

fn default_local_path() -> String {
    "/var/log/quarry".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    14
}
