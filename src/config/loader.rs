//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::QuarryConfig;
use super::secret::secret_string;
use crate::domain::errors::QuarryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into QuarryConfig
/// 4. Applies environment variable overrides (QUARRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, a referenced environment
/// variable is missing, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use quarry::config::loader::load_config;
///
/// let config = load_config("quarry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<QuarryConfig> {
    let config = read_config(path)?;

    config.validate().map_err(|e| {
        QuarryError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Reads and parses a configuration file without validating it
///
/// Used by commands that apply command-line overrides before validation.
pub fn read_config(path: impl AsRef<Path>) -> Result<QuarryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(QuarryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        QuarryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text without touching the filesystem
///
/// Performs `${VAR}` substitution and `QUARRY_*` overrides but does not
/// validate, so callers can apply CLI overrides first.
pub fn parse_config(contents: &str) -> Result<QuarryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: QuarryConfig = toml::from_str(&contents)
        .map_err(|e| QuarryError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("environment variable pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are passed through untouched. All missing variables are
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(QuarryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    val.parse().map_err(|e| {
        QuarryError::Configuration(format!("Invalid value for {name} ('{val}'): {e}"))
    })
}

/// Applies environment variable overrides using QUARRY_* prefix
///
/// Environment variables follow the pattern: QUARRY_<SECTION>_<KEY>,
/// for example QUARRY_DATABASE_NAME or QUARRY_EXPORT_LAYOUT.
fn apply_env_overrides(config: &mut QuarryConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("QUARRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Database overrides
    if let Ok(val) = std::env::var("QUARRY_DATABASE_NAME") {
        config.database.name = val;
    }
    if let Ok(val) = std::env::var("QUARRY_DATABASE_HOST") {
        config.database.host = Some(val);
    }
    if let Ok(val) = std::env::var("QUARRY_DATABASE_PORT") {
        config.database.port = Some(parse_env("QUARRY_DATABASE_PORT", &val)?);
    }
    if let Ok(val) = std::env::var("QUARRY_DATABASE_USER") {
        config.database.user = Some(val);
    }
    if let Ok(val) = std::env::var("QUARRY_DATABASE_PASSWORD") {
        config.database.password = Some(secret_string(val));
    }

    // Tool overrides
    if let Ok(val) = std::env::var("QUARRY_TOOLS_DUMP_COMMAND") {
        config.tools.dump_command = val;
    }
    if let Ok(val) = std::env::var("QUARRY_TOOLS_CLIENT_COMMAND") {
        config.tools.client_command = val;
    }

    // Export overrides
    if let Ok(val) = std::env::var("QUARRY_EXPORT_MODE") {
        config.export.mode = parse_env("QUARRY_EXPORT_MODE", &val)?;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_LAYOUT") {
        config.export.layout = parse_env("QUARRY_EXPORT_LAYOUT", &val)?;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_EXECUTION") {
        config.export.execution = parse_env("QUARRY_EXPORT_EXECUTION", &val)?;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_OUTPUT_DIR") {
        config.export.output_dir = val;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_CLAUSE_BUDGET") {
        config.export.clause_budget = parse_env("QUARRY_EXPORT_CLAUSE_BUDGET", &val)?;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_MAX_CONCURRENT_TABLES") {
        config.export.max_concurrent_tables =
            parse_env("QUARRY_EXPORT_MAX_CONCURRENT_TABLES", &val)?;
    }

    // Catalog overrides
    if let Ok(val) = std::env::var("QUARRY_CATALOG_SELECTION_MANIFEST") {
        config.catalog.selection_manifest = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("QUARRY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("QUARRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("QUARRY_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${QUARRY_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("QUARRY_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("QUARRY_LOADER_MISSING_VAR");
        let input = "password = \"${QUARRY_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("QUARRY_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("QUARRY_LOADER_COMMENTED_VAR");
        let input = "# password = \"${QUARRY_LOADER_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${QUARRY_LOADER_COMMENTED_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[database]
name = "lush"
host = "127.0.0.1"
port = 3306

[export]
layout = "split"
execution = "concurrent"
output_dir = "/tmp/quarry-dump"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.database.name, "lush");
        assert_eq!(config.database.port, Some(3306));
        assert_eq!(config.export.output_dir, "/tmp/quarry-dump");
    }

    #[test]
    fn test_load_config_invalid_fails_validation() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[database]\nname = \"lush\"\n\n[export]\nclause_budget = 0\n")
            .unwrap();
        temp_file.flush().unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("clause_budget"));
    }
}
