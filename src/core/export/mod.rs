//! Export orchestration
//!
//! This module provides the core export logic for quarry, including:
//! - Batching of row predicates into bounded `WHERE` clauses
//! - Fragment dumps with lock/unlock stitching
//! - Per-table coordination and progress reporting
//! - Unified and split artifact output
//! - Summary and reporting

pub mod batch;
pub mod fragment;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod sink;
pub mod summary;
pub mod table;

pub use batch::{batch_clauses, DEFAULT_CLAUSE_BUDGET};
pub use fragment::{FragmentDumper, FragmentPosition, LockBracket};
pub use naming::{artifact_file_name, FileNameAllocator};
pub use orchestrator::{describe_output, ExportOrchestrator};
pub use progress::ProgressReporter;
pub use sink::{ArtifactRecord, ArtifactSection, ArtifactSink, ExportUnit, UNIFIED_FILE_NAME};
pub use summary::{ExportError, ExportErrorType, ExportSummary, Phase, PhaseOutcome, TableOutcome};
pub use table::TableExporter;
