//! Dump tool abstraction

use crate::adapters::process::{OutputWriter, ProcessOutput};
use crate::domain::{DumpError, TableName};
use async_trait::async_trait;
use std::fmt;

/// One invocation of the dump tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpRequest {
    /// Schema definitions only, no rows
    Structure,
    /// Rows of one table, optionally restricted by a `WHERE` clause
    TableData {
        table: TableName,
        clause: Option<String>,
    },
    /// Stored routines only
    Routines,
    /// Schema, rows and routines in one pass
    WholeDatabase,
}

impl fmt::Display for DumpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpRequest::Structure => f.write_str("structure"),
            DumpRequest::TableData { table, clause } => match clause {
                Some(clause) => write!(f, "table {table} ({} byte clause)", clause.len()),
                None => write!(f, "table {table}"),
            },
            DumpRequest::Routines => f.write_str("routines"),
            DumpRequest::WholeDatabase => f.write_str("whole database"),
        }
    }
}

/// Produces SQL text for a [`DumpRequest`]
///
/// SQL is streamed into `out` while the tool runs. Implementations resolve
/// once the invocation has finished. `Err` means the tool could not be
/// started or its output could not be written; a tool that ran and failed
/// is reported through the returned [`ProcessOutput`] status, and whatever
/// it wrote before failing is left in `out` for the caller to discard.
#[async_trait]
pub trait DumpTool: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Runs one dump invocation to completion
    async fn dump(
        &self,
        request: &DumpRequest,
        out: OutputWriter<'_>,
    ) -> Result<ProcessOutput, DumpError>;
}
