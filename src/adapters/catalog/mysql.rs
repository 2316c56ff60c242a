//! Catalog backed by the MySQL `information_schema`

use super::manifest::SelectionManifest;
use super::traits::{Catalog, CatalogSelection};
use crate::adapters::process::{run_process, ConnectionArgs};
use crate::config::QuarryConfig;
use crate::domain::{DatabaseName, QuarryError, Result, TableName, TableSpec};
use async_trait::async_trait;
use std::path::PathBuf;

/// Lists base tables through the `mysql` client and applies row selections
#[derive(Debug, Clone)]
pub struct MysqlCatalog {
    command: String,
    database: DatabaseName,
    connection: ConnectionArgs,
    manifest_path: Option<PathBuf>,
    exclude: Vec<TableName>,
}

impl MysqlCatalog {
    /// Builds the catalog described by `config`
    pub fn from_config(config: &QuarryConfig) -> Result<Self> {
        let database = DatabaseName::new(config.database.name.as_str())
            .map_err(QuarryError::Configuration)?;
        let exclude = config
            .catalog
            .exclude_tables
            .iter()
            .map(|name| TableName::new(name.as_str()).map_err(QuarryError::Configuration))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            command: config.tools.client_command.clone(),
            database,
            connection: ConnectionArgs::from_config(&config.database),
            manifest_path: config.catalog.selection_manifest.as_ref().map(PathBuf::from),
            exclude,
        })
    }

    /// The query listing the schema's base tables
    pub fn table_list_query(&self) -> String {
        format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = '{}' AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            self.database.as_str().replace('\'', "''")
        )
    }

    async fn list_tables(&self) -> Result<Vec<TableName>> {
        let args: Vec<String> = self
            .connection
            .args()
            .iter()
            .cloned()
            .chain([
                "--batch".to_string(),
                "--skip-column-names".to_string(),
                "-e".to_string(),
                self.table_list_query(),
            ])
            .collect();

        let mut stdout = Vec::new();
        run_process(&self.command, &args, &self.connection, &mut stdout)
            .await?
            .into_result(&self.command)?;
        parse_table_list(&String::from_utf8_lossy(&stdout))
    }
}

/// Parses `--batch --skip-column-names` output, one table name per line
fn parse_table_list(output: &str) -> Result<Vec<TableName>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            TableName::new(line)
                .map_err(|e| QuarryError::Catalog(format!("Unexpected table name: {e}")))
        })
        .collect()
}

#[async_trait]
impl Catalog for MysqlCatalog {
    async fn fetch_tables(&self, selection: CatalogSelection) -> Result<Vec<TableSpec>> {
        let names: Vec<TableName> = self
            .list_tables()
            .await?
            .into_iter()
            .filter(|name| !self.exclude.contains(name))
            .collect();

        tracing::debug!(
            database = %self.database,
            count = names.len(),
            selection = %selection,
            "Listed tables"
        );

        match selection {
            CatalogSelection::Full => Ok(names.into_iter().map(TableSpec::unfiltered).collect()),
            CatalogSelection::Filtered => {
                let path = self.manifest_path.as_ref().ok_or_else(|| {
                    QuarryError::Catalog(
                        "A selection manifest is required for a filtered export".to_string(),
                    )
                })?;
                let manifest = SelectionManifest::load(path).await?;
                Ok(manifest.apply(names))
            }
        }
    }
}
