//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use super::sink::ArtifactRecord;
use crate::config::{ExecutionMode, ExportMode, OutputLayout};
use crate::domain::{DatabaseName, DumpError, TableName};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// The non-table phases of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Structure,
    Routines,
    /// Schema, rows and routines in one dump
    WholeDatabase,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Structure => "structure",
            Phase::Routines => "routines",
            Phase::WholeDatabase => "whole database",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one structure, routines or whole-database dump
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub bytes_written: u64,
    pub errors: Vec<DumpError>,
    pub duration: Duration,
}

impl PhaseOutcome {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            bytes_written: 0,
            errors: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of exporting one table's rows
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: TableName,

    /// Number of dump invocations planned for the table
    pub fragments: usize,

    /// Fragments whose dump failed; their output was discarded
    pub fragments_failed: usize,

    pub bytes_written: u64,

    pub errors: Vec<DumpError>,
}

impl TableOutcome {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            fragments: 0,
            fragments_failed: 0,
            bytes_written: 0,
            errors: Vec::new(),
        }
    }

    /// Record a failed fragment
    pub fn add_fragment_failure(&mut self, error: DumpError) {
        self.fragments_failed += 1;
        self.errors.push(error);
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Type of export error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorType {
    /// The dump tool could not be started
    Spawn,
    /// The dump tool exited with a failure status
    Exit,
    /// An artifact could not be written
    Write,
}

impl From<&DumpError> for ExportErrorType {
    fn from(error: &DumpError) -> Self {
        match error {
            DumpError::Spawn { .. } => ExportErrorType::Spawn,
            DumpError::Exit { .. } => ExportErrorType::Exit,
            DumpError::Write(_) => ExportErrorType::Write,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// The unit that failed (a phase or `table <name>`)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<&DumpError> for ExportError {
    fn from(error: &DumpError) -> Self {
        ExportError::new(error.into(), error.to_string())
    }
}

/// Summary of an export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub database: DatabaseName,
    pub mode: ExportMode,
    pub layout: OutputLayout,
    pub execution: ExecutionMode,

    pub started_at: DateTime<Utc>,

    /// Tables returned by the catalog
    pub total_tables: usize,
    pub tables_succeeded: usize,
    pub tables_failed: usize,

    pub phases: Vec<PhaseOutcome>,
    pub tables: Vec<TableOutcome>,

    /// Files written, in replay order
    pub artifacts: Vec<ArtifactRecord>,

    /// Every failure of the run
    pub errors: Vec<ExportError>,

    pub duration: Duration,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new(
        database: DatabaseName,
        mode: ExportMode,
        layout: OutputLayout,
        execution: ExecutionMode,
    ) -> Self {
        Self {
            database,
            mode,
            layout,
            execution,
            started_at: Utc::now(),
            total_tables: 0,
            tables_succeeded: 0,
            tables_failed: 0,
            phases: Vec::new(),
            tables: Vec::new(),
            artifacts: Vec::new(),
            errors: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Record a finished phase and its failures
    pub fn add_phase(&mut self, outcome: PhaseOutcome) {
        for error in &outcome.errors {
            self.add_error(ExportError::from(error).with_context(outcome.phase.to_string()));
        }
        self.phases.push(outcome);
    }

    /// Record a finished table and its failures
    pub fn add_table(&mut self, outcome: TableOutcome) {
        if outcome.succeeded() {
            self.tables_succeeded += 1;
        } else {
            self.tables_failed += 1;
        }
        for error in &outcome.errors {
            self.add_error(ExportError::from(error).with_context(format!("table {}", outcome.table)));
        }
        self.tables.push(outcome);
    }

    /// Total bytes of SQL captured across phases and tables
    pub fn bytes_written(&self) -> u64 {
        self.phases.iter().map(|p| p.bytes_written).sum::<u64>()
            + self.tables.iter().map(|t| t.bytes_written).sum::<u64>()
    }

    /// Check if the export was successful (no failed unit)
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            database = %self.database,
            mode = %self.mode,
            layout = %self.layout,
            execution = %self.execution,
            started_at = %self.started_at.to_rfc3339(),
            total_tables = self.total_tables,
            tables_succeeded = self.tables_succeeded,
            tables_failed = self.tables_failed,
            bytes_written = self.bytes_written(),
            artifacts = self.artifacts.len(),
            duration_secs = self.duration.as_secs(),
            "Export completed"
        );

        for artifact in &self.artifacts {
            tracing::info!(
                artifact = %artifact.path.display(),
                bytes = artifact.bytes,
                sha256 = %artifact.sha256,
                "Artifact"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    context = error.context.as_deref().unwrap_or(""),
                    message = %error.message,
                    "Export error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ExportSummary {
        ExportSummary::new(
            DatabaseName::new("lush").unwrap(),
            ExportMode::Full,
            OutputLayout::Unified,
            ExecutionMode::Sequential,
        )
    }

    fn exit_error() -> DumpError {
        DumpError::Exit {
            tool: "mysqldump".to_string(),
            code: Some(2),
            stderr: "Access denied".to_string(),
        }
    }

    #[test]
    fn test_export_summary_creation() {
        let summary = summary();

        assert_eq!(summary.total_tables, 0);
        assert_eq!(summary.tables_succeeded, 0);
        assert_eq!(summary.tables_failed, 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.errors.is_empty());
        assert!(summary.is_successful());
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = summary().with_duration(Duration::from_secs(120));

        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_add_table_counts_outcomes() {
        let mut summary = summary();

        let mut ok = TableOutcome::new(TableName::new("album").unwrap());
        ok.fragments = 1;
        ok.bytes_written = 10;
        summary.add_table(ok);

        let mut failed = TableOutcome::new(TableName::new("track").unwrap());
        failed.fragments = 3;
        failed.bytes_written = 5;
        failed.add_fragment_failure(exit_error());
        summary.add_table(failed);

        assert_eq!(summary.tables_succeeded, 1);
        assert_eq!(summary.tables_failed, 1);
        assert_eq!(summary.bytes_written(), 15);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::Exit);
        assert_eq!(summary.errors[0].context.as_deref(), Some("table track"));
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_add_phase_records_errors() {
        let mut summary = summary();
        let mut outcome = PhaseOutcome::new(Phase::Structure);
        outcome.errors.push(DumpError::Spawn {
            tool: "mysqldump".to_string(),
            message: "No such file or directory".to_string(),
        });
        summary.add_phase(outcome);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::Spawn);
        assert_eq!(summary.errors[0].context.as_deref(), Some("structure"));
    }

    #[test]
    fn test_export_error_with_context() {
        let error = ExportError::new(ExportErrorType::Write, "Disk full".to_string())
            .with_context("routines".to_string());

        assert_eq!(error.error_type, ExportErrorType::Write);
        assert_eq!(error.context, Some("routines".to_string()));
    }
}
