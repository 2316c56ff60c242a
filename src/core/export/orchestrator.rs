//! Export orchestrator - top-level driver of an export run
//!
//! A run dumps the schema structure, then every table's rows, then the
//! stored routines. Sequential execution awaits each unit before starting
//! the next; concurrent execution starts the three phases together and
//! fans the tables out under a concurrency limit. Either way the run
//! settles every unit before it reports completion, and a failed unit never
//! stops the others.

use super::progress::ProgressReporter;
use super::sink::{ArtifactRecord, ArtifactSink, ExportUnit};
use super::summary::{ExportError, ExportSummary, Phase, PhaseOutcome, TableOutcome};
use super::table::TableExporter;
use crate::adapters::catalog::{Catalog, CatalogSelection, MysqlCatalog};
use crate::adapters::dump::{DumpRequest, DumpTool, MysqlDump};
use crate::config::{ExecutionMode, ExportConfig, ExportMode, OutputLayout, QuarryConfig};
use crate::domain::{DatabaseName, QuarryError, Result, TableName, TableSpec};
use crate::{log_phase_complete, log_phase_start};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Drives a whole database export
pub struct ExportOrchestrator {
    database: DatabaseName,
    settings: ExportConfig,
    tool: Arc<dyn DumpTool>,
    catalog: Arc<dyn Catalog>,
}

/// A finished unit and the artifact it produced on its own, if any
type UnitReport<T> = (T, Option<ArtifactRecord>);

impl ExportOrchestrator {
    pub fn new(
        database: DatabaseName,
        settings: ExportConfig,
        tool: Arc<dyn DumpTool>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            database,
            settings,
            tool,
            catalog,
        }
    }

    /// Wires `mysqldump` and the `mysql` catalog from configuration
    pub fn from_config(config: &QuarryConfig) -> Result<Self> {
        let database = DatabaseName::new(config.database.name.as_str())
            .map_err(QuarryError::Configuration)?;
        let tool = Arc::new(MysqlDump::from_config(config)?);
        let catalog = Arc::new(MysqlCatalog::from_config(config)?);

        Ok(Self::new(database, config.export.clone(), tool, catalog))
    }

    pub fn output_dir(&self) -> &Path {
        Path::new(&self.settings.output_dir)
    }

    /// Execute the export
    ///
    /// Unit failures are recorded in the summary, never returned. `Err`
    /// means the run could not start: the output directory could not be
    /// prepared or the catalog could not list the tables.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::new(
            self.database.clone(),
            self.settings.mode,
            self.settings.layout,
            self.settings.execution,
        );

        self.prepare_output_dir().await?;

        tracing::info!(
            database = %self.database,
            mode = %self.settings.mode,
            layout = %self.settings.layout,
            execution = %self.settings.execution,
            "Dumping {} database...",
            self.database.quoted()
        );

        match self.settings.mode {
            ExportMode::Whole => self.export_whole(&mut summary).await,
            ExportMode::Full => {
                self.export_phases(CatalogSelection::Full, &mut summary)
                    .await?
            }
            ExportMode::Filtered => {
                self.export_phases(CatalogSelection::Filtered, &mut summary)
                    .await?
            }
        }

        tracing::info!(
            database = %self.database,
            "{} database dumped.",
            self.database.quoted()
        );

        Ok(summary.with_duration(start_time.elapsed()))
    }

    async fn prepare_output_dir(&self) -> Result<()> {
        let dir = self.output_dir();
        if !tokio::fs::try_exists(dir).await? {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                QuarryError::Io(format!(
                    "Failed to create output directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            tracing::info!("\"{}\" directory created.", dir.display());
        }
        tracing::info!("Using \"{}\" directory.", dir.display());
        Ok(())
    }

    async fn export_whole(&self, summary: &mut ExportSummary) {
        let sink = ArtifactSink::whole(self.output_dir(), self.database.clone());
        let (outcome, artifact) = self.dump_phase(&sink, Phase::WholeDatabase).await;
        summary.add_phase(outcome);
        summary.artifacts.extend(artifact);
        self.finish_sink(sink, summary).await;
    }

    async fn export_phases(
        &self,
        selection: CatalogSelection,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let tables = self.catalog.fetch_tables(selection).await?;
        summary.total_tables = tables.len();
        tracing::info!(
            tables = tables.len(),
            selection = %selection,
            "Fetched table list"
        );

        let sink = match self.settings.layout {
            OutputLayout::Unified => {
                ArtifactSink::unified(self.output_dir(), self.database.clone(), tables.len())
            }
            OutputLayout::Split => {
                let names: Vec<TableName> = tables.iter().map(|t| t.name.clone()).collect();
                ArtifactSink::split(self.output_dir(), self.database.clone(), &names)
            }
        };
        let progress = Arc::new(ProgressReporter::new(tables.len()));
        let exporter = TableExporter::new(
            self.tool.clone(),
            self.settings.clause_budget,
            progress.clone(),
        );

        let (structure, table_reports, routines) = match self.settings.execution {
            ExecutionMode::Sequential => {
                let structure = self.dump_phase(&sink, Phase::Structure).await;
                let table_reports = self.export_tables_sequential(&sink, &exporter, &tables).await;
                let routines = self.dump_phase(&sink, Phase::Routines).await;
                (structure, table_reports, routines)
            }
            ExecutionMode::Concurrent => {
                tokio::join!(
                    self.dump_phase(&sink, Phase::Structure),
                    self.export_tables_concurrent(&sink, &exporter, &tables),
                    self.dump_phase(&sink, Phase::Routines),
                )
            }
        };

        let mut artifacts: Vec<ArtifactRecord> = Vec::new();
        let (structure, artifact) = structure;
        summary.add_phase(structure);
        artifacts.extend(artifact);
        for (outcome, artifact) in table_reports {
            summary.add_table(outcome);
            artifacts.extend(artifact);
        }
        let (routines, artifact) = routines;
        summary.add_phase(routines);
        artifacts.extend(artifact);
        summary.artifacts.extend(artifacts);

        tracing::debug!(
            completed = progress.read(),
            total = progress.total(),
            "All tables settled"
        );

        self.finish_sink(sink, summary).await;
        Ok(())
    }

    async fn finish_sink(&self, sink: ArtifactSink, summary: &mut ExportSummary) {
        match sink.finish().await {
            Ok(Some(record)) => summary.artifacts.push(record),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to write unified artifact");
                summary.add_error(ExportError::from(&e).with_context("artifact".to_string()));
            }
        }
    }

    /// Streams structure, routines or the whole database into its section
    async fn dump_phase(&self, sink: &ArtifactSink, phase: Phase) -> UnitReport<PhaseOutcome> {
        let (unit, request, start_message, done_message) = match phase {
            Phase::Structure => (
                ExportUnit::Structure,
                DumpRequest::Structure,
                "Dumping structure...",
                "Structure dumped.",
            ),
            Phase::Routines => (
                ExportUnit::Routines,
                DumpRequest::Routines,
                "Dumping routines...",
                "Routines dumped.",
            ),
            Phase::WholeDatabase => (
                ExportUnit::Structure,
                DumpRequest::WholeDatabase,
                "Dumping whole database...",
                "Whole database dumped.",
            ),
        };

        log_phase_start!(phase.as_str(), start_message);
        let start_time = Instant::now();
        let mut outcome = PhaseOutcome::new(phase);
        let mut section = sink.section(unit);

        match section.dump_from(self.tool.as_ref(), &request).await {
            Ok(bytes) => outcome.bytes_written = bytes,
            Err(e) => {
                tracing::error!(phase = phase.as_str(), error = %e, "Phase dump failed");
                outcome.errors.push(e);
            }
        }

        let artifact = match section.commit().await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(phase = phase.as_str(), error = %e, "Failed to write phase output");
                outcome.errors.push(e);
                None
            }
        };

        outcome.duration = start_time.elapsed();
        if outcome.succeeded() {
            log_phase_complete!(phase.as_str(), done_message, outcome.duration);
        }

        (outcome, artifact)
    }

    async fn export_table(
        &self,
        sink: &ArtifactSink,
        exporter: &TableExporter,
        index: usize,
        spec: &TableSpec,
    ) -> UnitReport<TableOutcome> {
        let mut section = sink.section(ExportUnit::Table(index));
        let mut outcome = exporter.export(spec, &mut section).await;

        let artifact = match section.commit().await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(table = %spec.name, error = %e, "Failed to write table output");
                outcome.errors.push(e);
                None
            }
        };

        (outcome, artifact)
    }

    async fn export_tables_sequential(
        &self,
        sink: &ArtifactSink,
        exporter: &TableExporter,
        tables: &[TableSpec],
    ) -> Vec<UnitReport<TableOutcome>> {
        log_phase_start!("tables", "Dumping tables...");
        let start_time = Instant::now();

        let mut reports = Vec::with_capacity(tables.len());
        for (index, spec) in tables.iter().enumerate() {
            reports.push(self.export_table(sink, exporter, index, spec).await);
        }

        log_phase_complete!("tables", "Tables dumped.", start_time.elapsed());
        reports
    }

    async fn export_tables_concurrent(
        &self,
        sink: &ArtifactSink,
        exporter: &TableExporter,
        tables: &[TableSpec],
    ) -> Vec<UnitReport<TableOutcome>> {
        log_phase_start!("tables", "Dumping tables...");
        let start_time = Instant::now();
        let limiter = Semaphore::new(self.settings.max_concurrent_tables.max(1));

        let reports = join_all(tables.iter().enumerate().map(|(index, spec)| {
            let limiter = &limiter;
            async move {
                // The semaphore is never closed
                let _permit = limiter.acquire().await.ok();
                self.export_table(sink, exporter, index, spec).await
            }
        }))
        .await;

        log_phase_complete!("tables", "Tables dumped.", start_time.elapsed());
        reports
    }
}

/// Where an export with `layout` writes inside `dir`
pub fn describe_output(dir: &Path, layout: OutputLayout) -> PathBuf {
    match layout {
        OutputLayout::Unified => dir.join(super::sink::UNIFIED_FILE_NAME),
        OutputLayout::Split => dir.to_path_buf(),
    }
}
