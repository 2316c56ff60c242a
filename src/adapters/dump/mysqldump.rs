//! `mysqldump` implementation of [`DumpTool`]

use super::traits::{DumpRequest, DumpTool};
use crate::adapters::process::{run_process, ConnectionArgs, OutputWriter, ProcessOutput};
use crate::config::QuarryConfig;
use crate::domain::{DatabaseName, DumpError, QuarryError, Result};
use async_trait::async_trait;

/// Runs the configured mysqldump-compatible command
#[derive(Debug, Clone)]
pub struct MysqlDump {
    command: String,
    database: DatabaseName,
    connection: ConnectionArgs,
    extra_args: Vec<String>,
}

impl MysqlDump {
    pub fn new(
        command: impl Into<String>,
        database: DatabaseName,
        connection: ConnectionArgs,
        extra_args: Vec<String>,
    ) -> Self {
        Self {
            command: command.into(),
            database,
            connection,
            extra_args,
        }
    }

    /// Builds the dump tool described by `config`
    pub fn from_config(config: &QuarryConfig) -> Result<Self> {
        let database = DatabaseName::new(config.database.name.as_str())
            .map_err(QuarryError::Configuration)?;
        Ok(Self::new(
            config.tools.dump_command.clone(),
            database,
            ConnectionArgs::from_config(&config.database),
            config.tools.extra_args.clone(),
        ))
    }

    /// Full argument list for one request
    pub fn args_for(&self, request: &DumpRequest) -> Vec<String> {
        let mut args: Vec<String> = self.connection.args().to_vec();
        args.extend(self.extra_args.iter().cloned());

        let db = self.database.as_str().to_string();
        match request {
            DumpRequest::Structure => {
                args.extend(["--no-data".to_string(), "--databases".to_string(), db]);
            }
            DumpRequest::TableData { table, clause } => {
                args.push("--no-create-info".to_string());
                if let Some(clause) = clause {
                    args.push(format!("--where={clause}"));
                }
                args.extend([db, table.as_str().to_string()]);
            }
            DumpRequest::Routines => {
                args.extend([
                    "--routines".to_string(),
                    "--no-create-db".to_string(),
                    "--no-data".to_string(),
                    "--no-create-info".to_string(),
                    db,
                ]);
            }
            DumpRequest::WholeDatabase => {
                args.extend(["--routines".to_string(), "--databases".to_string(), db]);
            }
        }
        args
    }
}

#[async_trait]
impl DumpTool for MysqlDump {
    fn name(&self) -> &str {
        &self.command
    }

    async fn dump(
        &self,
        request: &DumpRequest,
        out: OutputWriter<'_>,
    ) -> std::result::Result<ProcessOutput, DumpError> {
        let args = self.args_for(request);
        run_process(&self.command, &args, &self.connection, out).await
    }
}
