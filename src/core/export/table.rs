//! Per-table export
//!
//! Plans a table's fragments, runs them strictly one after another into the
//! table's section, and reports progress once the table is done. A table
//! dumped in one piece is streamed straight into its section; fragments of
//! a split table are stitched in memory one at a time.

use super::batch::batch_clauses;
use super::fragment::{FragmentDumper, FragmentPosition, LockBracket};
use super::progress::ProgressReporter;
use super::sink::ArtifactSection;
use super::summary::TableOutcome;
use crate::adapters::dump::DumpTool;
use crate::domain::{TableSelection, TableSpec};
use crate::log_table_progress;
use std::sync::Arc;

/// Exports the rows of single tables
#[derive(Clone)]
pub struct TableExporter {
    dumper: FragmentDumper,
    clause_budget: usize,
    progress: Arc<ProgressReporter>,
}

impl TableExporter {
    pub fn new(
        tool: Arc<dyn DumpTool>,
        clause_budget: usize,
        progress: Arc<ProgressReporter>,
    ) -> Self {
        Self {
            dumper: FragmentDumper::new(tool),
            clause_budget,
            progress,
        }
    }

    /// The `WHERE` clause of each fragment, in dump order
    ///
    /// An unfiltered table is one fragment without a clause. A table
    /// filtered down to no predicates has no fragments at all.
    pub fn plan_fragments(&self, spec: &TableSpec) -> Vec<Option<String>> {
        match &spec.selection {
            TableSelection::Unfiltered => vec![None],
            TableSelection::Filtered(predicates) => batch_clauses(predicates, self.clause_budget)
                .into_iter()
                .map(Some)
                .collect(),
        }
    }

    /// Dumps every fragment of `spec` into `section`
    ///
    /// A failed fragment marks the table failed but the remaining fragments
    /// are still attempted, and the table's lock bracket is kept balanced.
    /// Never returns early.
    pub async fn export(&self, spec: &TableSpec, section: &mut ArtifactSection) -> TableOutcome {
        let clauses = self.plan_fragments(spec);
        let total = clauses.len();
        let mut outcome = TableOutcome::new(spec.name.clone());
        outcome.fragments = total;
        let mut bracket = LockBracket::new(&spec.name, total);

        if total == 0 {
            tracing::debug!(table = %spec.name, "No rows selected, skipping data dump");
        }

        for (offset, clause) in clauses.iter().enumerate() {
            let position = FragmentPosition::new(offset + 1, total);

            let written = if total == 1 {
                self.dumper
                    .stream(&spec.name, clause.as_deref(), section)
                    .await
            } else {
                match self
                    .dumper
                    .dump(&spec.name, clause.as_deref(), position, &mut bracket)
                    .await
                {
                    Ok(sql) => section.write(&sql).await.map(|()| sql.len() as u64),
                    Err(e) => Err(e),
                }
            };

            match written {
                Ok(bytes) => outcome.bytes_written += bytes,
                Err(e) => {
                    tracing::error!(
                        table = %spec.name,
                        fragment = position.index(),
                        fragments = total,
                        error = %e,
                        "Fragment dump failed"
                    );
                    outcome.add_fragment_failure(e);
                }
            }

            if clause.is_some() {
                tracing::info!(
                    table = %spec.name,
                    fragment = position.index(),
                    fragments = total,
                    "[{}/{}] Iteration of table \"{}\" done.",
                    position.index(),
                    total,
                    spec.name
                );
            }
        }

        if let Some(tail) = bracket.finish() {
            tracing::warn!(
                table = %spec.name,
                "Last fragment failed, closing the table lock"
            );
            match section.write(&tail).await {
                Ok(()) => outcome.bytes_written += tail.len() as u64,
                Err(e) => outcome.errors.push(e),
            }
        }

        let completed = self.progress.increment();
        log_table_progress!(
            completed,
            self.progress.total(),
            spec.name,
            outcome.succeeded()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dump::DumpRequest;
    use crate::adapters::process::{OutputWriter, ProcessOutput};
    use crate::core::export::sink::{ArtifactSink, ExportUnit, UNIFIED_FILE_NAME};
    use crate::domain::{DatabaseName, DumpError, Predicate, TableName};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    /// Answers table dumps with a bracketed row per clause, failing the
    /// invocations listed in `fail_calls` halfway through their output
    struct ScriptedTool {
        calls: Mutex<Vec<DumpRequest>>,
        fail_calls: Vec<usize>,
    }

    impl ScriptedTool {
        fn new(fail_calls: Vec<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_calls,
            })
        }

        fn calls(&self) -> Vec<DumpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DumpTool for ScriptedTool {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn dump(
            &self,
            request: &DumpRequest,
            out: OutputWriter<'_>,
        ) -> Result<ProcessOutput, DumpError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.clone());
                calls.len()
            };
            let DumpRequest::TableData { table, clause } = request else {
                return Ok(ProcessOutput::success());
            };
            let lock = format!("LOCK TABLES {} WRITE;\n", table.quoted());
            out.write_all(lock.as_bytes()).await.unwrap();
            if self.fail_calls.contains(&call) {
                return Ok(ProcessOutput::failed(Some(2), "scripted failure"));
            }
            let rows = format!(
                "-- rows {}\nUNLOCK TABLES;\n",
                clause.as_deref().unwrap_or("all")
            );
            out.write_all(rows.as_bytes()).await.unwrap();
            Ok(ProcessOutput::success())
        }
    }

    fn ids(count: i64) -> Vec<Predicate> {
        (0..count).map(|id| Predicate::new([("id", id)]).unwrap()).collect()
    }

    fn track(predicates: Vec<Predicate>) -> TableSpec {
        TableSpec::filtered(TableName::new("track").unwrap(), predicates)
    }

    async fn run(
        tool: Arc<ScriptedTool>,
        budget: usize,
        spec: &TableSpec,
    ) -> (TableOutcome, String, Arc<ProgressReporter>) {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::unified(dir.path(), DatabaseName::new("lush").unwrap(), 1);
        let progress = Arc::new(ProgressReporter::new(1));
        let exporter = TableExporter::new(tool, budget, progress.clone());

        let mut section = sink.section(ExportUnit::Table(0));
        let outcome = exporter.export(spec, &mut section).await;
        section.commit().await.unwrap();
        sink.finish().await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join(UNIFIED_FILE_NAME)).unwrap();
        (outcome, contents, progress)
    }

    #[tokio::test]
    async fn test_unfiltered_table_is_one_fragment() {
        let tool = ScriptedTool::new(vec![]);
        let spec = TableSpec::unfiltered(TableName::new("album").unwrap());
        let (outcome, contents, progress) = run(tool.clone(), 100, &spec).await;

        assert_eq!(
            tool.calls(),
            [DumpRequest::TableData {
                table: TableName::new("album").unwrap(),
                clause: None,
            }]
        );
        assert!(outcome.succeeded());
        assert_eq!(outcome.fragments, 1);
        assert_eq!(
            contents,
            "USE `lush`;\r\n\r\nLOCK TABLES `album` WRITE;\n-- rows all\nUNLOCK TABLES;\n"
        );
        assert_eq!(progress.read(), 1);
    }

    #[tokio::test]
    async fn test_fragments_share_one_bracket() {
        let tool = ScriptedTool::new(vec![]);
        // 6 ids per clause at a 60 byte budget
        let (outcome, contents, _) = run(tool.clone(), 60, &track(ids(14))).await;

        assert_eq!(outcome.fragments, 3);
        assert_eq!(tool.calls().len(), 3);
        assert_eq!(contents.matches("LOCK TABLES `track` WRITE;").count(), 1);
        assert_eq!(contents.matches("UNLOCK TABLES;").count(), 1);
        assert!(contents.ends_with("-- rows `id`=12 or `id`=13\nUNLOCK TABLES;\n"));
    }

    #[tokio::test]
    async fn test_failed_fragment_is_discarded_and_rest_attempted() {
        let tool = ScriptedTool::new(vec![2]);
        let (outcome, contents, progress) = run(tool.clone(), 60, &track(ids(14))).await;

        assert_eq!(tool.calls().len(), 3);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.fragments_failed, 1);
        assert_eq!(outcome.errors[0].kind(), "exit");
        assert!(!contents.contains("`id`=6"));
        assert!(contents.contains("`id`=12"));
        assert_eq!(contents.matches("LOCK TABLES `track` WRITE;").count(), 1);
        assert_eq!(contents.matches("UNLOCK TABLES;").count(), 1);
        assert_eq!(progress.read(), 1);
    }

    fn bracket_counts(contents: &str) -> (usize, usize) {
        let lines = || contents.lines().map(str::trim);
        (
            lines().filter(|l| *l == "LOCK TABLES `track` WRITE;").count(),
            lines().filter(|l| *l == "UNLOCK TABLES;").count(),
        )
    }

    #[tokio::test]
    async fn test_failed_first_fragment_keeps_one_bracket() {
        let tool = ScriptedTool::new(vec![1]);
        let (outcome, contents, _) = run(tool, 60, &track(ids(14))).await;

        assert_eq!(outcome.fragments_failed, 1);
        assert_eq!(bracket_counts(&contents), (1, 1));
        assert!(!contents.contains("`id`=0 "));
        let lock = contents.find("LOCK TABLES").unwrap();
        let rows = contents.find("`id`=6").unwrap();
        assert!(lock < rows);
        assert!(contents.ends_with("UNLOCK TABLES;\n"));
    }

    #[tokio::test]
    async fn test_failed_last_fragment_keeps_one_bracket() {
        let tool = ScriptedTool::new(vec![3]);
        let (outcome, contents, _) = run(tool, 60, &track(ids(14))).await;

        assert_eq!(outcome.fragments_failed, 1);
        assert_eq!(bracket_counts(&contents), (1, 1));
        assert!(!contents.contains("`id`=12"));
        assert!(contents.ends_with(
            "/*!40000 ALTER TABLE `track` ENABLE KEYS */;\nUNLOCK TABLES;\n"
        ));
    }

    #[tokio::test]
    async fn test_failed_single_fragment_leaves_only_use_directive() {
        let tool = ScriptedTool::new(vec![1]);
        let spec = TableSpec::unfiltered(TableName::new("album").unwrap());
        let (outcome, contents, progress) = run(tool, 100, &spec).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.bytes_written, 0);
        assert_eq!(contents, "USE `lush`;\r\n\r\n");
        assert_eq!(progress.read(), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_skips_dump() {
        let tool = ScriptedTool::new(vec![]);
        let (outcome, contents, progress) = run(tool.clone(), 60, &track(Vec::new())).await;

        assert!(tool.calls().is_empty());
        assert!(outcome.succeeded());
        assert_eq!(outcome.fragments, 0);
        assert_eq!(contents, "USE `lush`;\r\n\r\n");
        assert_eq!(progress.read(), 1);
    }
}
