//! Artifact output
//!
//! Every export unit (structure, one table, routines) writes into its own
//! [`ArtifactSection`], which is backed by a file from the first byte on so
//! no dump has to fit in memory. Committing the section hands it to the
//! configured layout:
//!
//! - **Unified**: each section is spooled to a hidden file next to
//!   `dump.sql`. A single writer task appends the spools to `dump.sql` in
//!   unit order, holding back any that arrive before their predecessors,
//!   so concurrent units produce the same file as a sequential run.
//! - **Split**: each section is its own `<prefix>-<label>-dump.sql` file.
//!   Names are allocated when the sink is created, in unit order.
//! - **Whole**: the single section is `dump.sql` itself.

use super::naming::FileNameAllocator;
use crate::adapters::dump::{DumpRequest, DumpTool};
use crate::domain::{DatabaseName, DumpError, TableName};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// File name of the unified artifact
pub const UNIFIED_FILE_NAME: &str = "dump.sql";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// One unit of work that owns a section of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportUnit {
    Structure,
    /// Zero-based position in the catalog's table list
    Table(usize),
    Routines,
}

/// A written artifact file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex-encoded SHA-256 of the file contents
    pub sha256: String,
}

impl ArtifactRecord {
    /// Reads `path` back in chunks to size and hash it
    async fn from_file(path: PathBuf) -> Result<Self, DumpError> {
        let mut file = File::open(&path).await.map_err(|e| write_error(&path, e))?;
        let mut hasher = Sha256::new();
        let mut bytes = 0u64;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| write_error(&path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            bytes += read as u64;
        }

        Ok(Self {
            path,
            bytes,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}

/// A finished unified section waiting for its turn
#[derive(Debug)]
enum Spool {
    Ready(PathBuf),
    /// Contributes nothing; the file, if any, is removed
    Abandoned(PathBuf),
}

type SpooledSection = (usize, Spool);

enum SinkTarget {
    Unified {
        sender: mpsc::UnboundedSender<SpooledSection>,
        writer: JoinHandle<Result<ArtifactRecord, DumpError>>,
    },
    Split {
        paths: Vec<PathBuf>,
    },
    Whole {
        path: PathBuf,
    },
}

/// Destination for every section of one export run
pub struct ArtifactSink {
    dir: PathBuf,
    database: DatabaseName,
    table_count: usize,
    target: SinkTarget,
}

impl ArtifactSink {
    /// Writes everything to `<dir>/dump.sql`
    ///
    /// Must be called from within a tokio runtime.
    pub fn unified(dir: &Path, database: DatabaseName, table_count: usize) -> Self {
        let path = dir.join(UNIFIED_FILE_NAME);
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_unified(path, receiver));

        Self {
            dir: dir.to_path_buf(),
            database,
            table_count,
            target: SinkTarget::Unified { sender, writer },
        }
    }

    /// Writes one file per unit into `dir`
    pub fn split(dir: &Path, database: DatabaseName, tables: &[TableName]) -> Self {
        let allocator = FileNameAllocator::new(tables.len());
        let paths = std::iter::once("structure")
            .chain(tables.iter().map(TableName::as_str))
            .chain(std::iter::once("routines"))
            .map(|label| dir.join(allocator.next_file_name(label)))
            .collect();

        Self {
            dir: dir.to_path_buf(),
            database,
            table_count: tables.len(),
            target: SinkTarget::Split { paths },
        }
    }

    /// Writes the single [`ExportUnit::Structure`] section straight to
    /// `<dir>/dump.sql`
    pub fn whole(dir: &Path, database: DatabaseName) -> Self {
        Self {
            dir: dir.to_path_buf(),
            database,
            table_count: 0,
            target: SinkTarget::Whole {
                path: dir.join(UNIFIED_FILE_NAME),
            },
        }
    }

    fn slot(&self, unit: ExportUnit) -> usize {
        match unit {
            ExportUnit::Structure => 0,
            ExportUnit::Table(index) => index + 1,
            ExportUnit::Routines => self.table_count + 1,
        }
    }

    /// Opens the section for `unit`
    ///
    /// Table and routine sections start with a `USE` directive; the
    /// structure dump selects its database itself. The backing file is
    /// created on first use.
    pub fn section(&self, unit: ExportUnit) -> ArtifactSection {
        let slot = self.slot(unit);
        let prefix = match unit {
            ExportUnit::Structure => Vec::new(),
            ExportUnit::Table(_) | ExportUnit::Routines => {
                self.database.use_directive().into_bytes()
            }
        };
        let (path, target) = match &self.target {
            SinkTarget::Unified { sender, .. } => (
                self.dir.join(format!(".{UNIFIED_FILE_NAME}.{slot}.part")),
                SectionTarget::Unified {
                    slot,
                    sender: sender.clone(),
                },
            ),
            SinkTarget::Split { paths } => (
                paths
                    .get(slot)
                    .cloned()
                    .unwrap_or_else(|| self.dir.join(format!("{slot}-dump.sql"))),
                SectionTarget::File,
            ),
            SinkTarget::Whole { path } => (path.clone(), SectionTarget::File),
        };

        ArtifactSection {
            path,
            prefix,
            file: None,
            len: 0,
            target: Some(target),
        }
    }

    /// Planned artifact path for `unit` (split layout only)
    pub fn split_path(&self, unit: ExportUnit) -> Option<&Path> {
        match &self.target {
            SinkTarget::Split { paths } => paths.get(self.slot(unit)).map(PathBuf::as_path),
            SinkTarget::Unified { .. } | SinkTarget::Whole { .. } => None,
        }
    }

    /// Waits for the unified writer to drain
    ///
    /// Every section must have been committed or dropped first. Returns the
    /// unified artifact's record; other layouts report their files when
    /// sections are committed.
    pub async fn finish(self) -> Result<Option<ArtifactRecord>, DumpError> {
        match self.target {
            SinkTarget::Unified { sender, writer } => {
                drop(sender);
                let record = writer
                    .await
                    .map_err(|e| DumpError::Write(format!("Artifact writer stopped: {e}")))??;
                Ok(Some(record))
            }
            SinkTarget::Split { .. } | SinkTarget::Whole { .. } => Ok(None),
        }
    }
}

enum SectionTarget {
    Unified {
        slot: usize,
        sender: mpsc::UnboundedSender<SpooledSection>,
    },
    /// The section's file is the artifact
    File,
}

/// File-backed output of one export unit
///
/// A unified section that is dropped without being committed is reported
/// as abandoned, so the writer never waits on a missing unit.
pub struct ArtifactSection {
    path: PathBuf,
    prefix: Vec<u8>,
    file: Option<File>,
    len: u64,
    target: Option<SectionTarget>,
}

impl ArtifactSection {
    /// Bytes in the section so far, `USE` directive included
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing file of the section, created with its prefix on first use
    async fn file(&mut self) -> Result<&mut File, DumpError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let mut file = File::create(&self.path)
                    .await
                    .map_err(|e| write_error(&self.path, e))?;
                file.write_all(&self.prefix)
                    .await
                    .map_err(|e| write_error(&self.path, e))?;
                self.len = self.prefix.len() as u64;
                file
            }
        };
        Ok(self.file.insert(file))
    }

    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), DumpError> {
        let file = self.file().await?;
        if let Err(e) = file.write_all(bytes).await {
            return Err(write_error(&self.path, e));
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Streams one dump straight into the section
    ///
    /// Returns the number of bytes the dump added. When the dump fails,
    /// whatever it wrote is cut off again so the section never holds
    /// partial output.
    pub async fn dump_from(
        &mut self,
        tool: &dyn DumpTool,
        request: &DumpRequest,
    ) -> Result<u64, DumpError> {
        let file = self.file().await?;
        let result = match tool.dump(request, file).await {
            Ok(output) => output.into_result(tool.name()),
            Err(e) => Err(e),
        };
        let start = self.len;

        match result {
            Ok(()) => {
                let end = self
                    .position()
                    .await
                    .map_err(|e| write_error(&self.path, e))?;
                self.len = end;
                Ok(end - start)
            }
            Err(e) => match self.truncate(start).await {
                Ok(()) => Err(e),
                Err(rollback) => Err(DumpError::Write(format!(
                    "{e}; partial output left in {}: {rollback}",
                    self.path.display()
                ))),
            },
        }
    }

    async fn position(&mut self) -> std::io::Result<u64> {
        match &mut self.file {
            Some(file) => {
                file.flush().await?;
                file.seek(SeekFrom::Current(0)).await
            }
            None => Ok(self.len),
        }
    }

    async fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        if let Some(file) = &mut self.file {
            file.flush().await?;
            file.set_len(len).await?;
            file.seek(SeekFrom::Start(len)).await?;
        }
        self.len = len;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DumpError> {
        let file = self.file().await?;
        if let Err(e) = file.flush().await {
            return Err(write_error(&self.path, e));
        }
        self.file = None;
        Ok(())
    }

    /// Hands the section to its artifact
    ///
    /// Returns the artifact record when the section is a file of its own.
    pub async fn commit(mut self) -> Result<Option<ArtifactRecord>, DumpError> {
        let closed = self.close().await;
        let path = std::mem::take(&mut self.path);

        match self.target.take() {
            Some(SectionTarget::Unified { slot, sender }) => {
                let spool = match &closed {
                    Ok(()) => Spool::Ready(path),
                    Err(_) => Spool::Abandoned(path),
                };
                sender.send((slot, spool)).map_err(|_| {
                    DumpError::Write("Unified artifact writer is no longer running".to_string())
                })?;
                closed.map(|()| None)
            }
            Some(SectionTarget::File) => {
                closed?;
                let record = ArtifactRecord::from_file(path).await?;
                tracing::debug!(
                    artifact = %record.path.display(),
                    bytes = record.bytes,
                    "Artifact written"
                );
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

impl Drop for ArtifactSection {
    fn drop(&mut self) {
        if let Some(SectionTarget::Unified { slot, sender }) = self.target.take() {
            let path = std::mem::take(&mut self.path);
            let _ = sender.send((slot, Spool::Abandoned(path)));
        }
    }
}

fn write_error(path: &Path, error: std::io::Error) -> DumpError {
    DumpError::Write(format!("{}: {}", path.display(), error))
}

/// Appends one spooled section to the unified artifact and removes it
async fn append_spool(
    file: &mut File,
    path: &Path,
    spool: Spool,
    hasher: &mut Sha256,
) -> Result<u64, DumpError> {
    let spool_path = match spool {
        Spool::Ready(spool_path) => spool_path,
        Spool::Abandoned(spool_path) => {
            let _ = tokio::fs::remove_file(&spool_path).await;
            return Ok(0);
        }
    };

    let mut source = File::open(&spool_path)
        .await
        .map_err(|e| write_error(&spool_path, e))?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes = 0u64;
    loop {
        let read = source
            .read(&mut buffer)
            .await
            .map_err(|e| write_error(&spool_path, e))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .await
            .map_err(|e| write_error(path, e))?;
        hasher.update(&buffer[..read]);
        bytes += read as u64;
    }
    drop(source);

    tokio::fs::remove_file(&spool_path)
        .await
        .map_err(|e| write_error(&spool_path, e))?;
    Ok(bytes)
}

async fn write_unified(
    path: PathBuf,
    mut receiver: mpsc::UnboundedReceiver<SpooledSection>,
) -> Result<ArtifactRecord, DumpError> {
    let mut file = File::create(&path)
        .await
        .map_err(|e| write_error(&path, e))?;
    let mut hasher = Sha256::new();
    let mut bytes = 0u64;
    let mut pending: BTreeMap<usize, Spool> = BTreeMap::new();
    let mut next = 0;

    while let Some((slot, spool)) = receiver.recv().await {
        pending.insert(slot, spool);
        while let Some(spool) = pending.remove(&next) {
            bytes += append_spool(&mut file, &path, spool, &mut hasher).await?;
            next += 1;
        }
    }

    // Units that never reported leave gaps; keep the rest in order.
    for spool in pending.into_values() {
        bytes += append_spool(&mut file, &path, spool, &mut hasher).await?;
    }

    file.flush().await.map_err(|e| write_error(&path, e))?;
    tracing::debug!(artifact = %path.display(), bytes, "Artifact written");

    Ok(ArtifactRecord {
        path,
        bytes,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::process::{OutputWriter, ProcessOutput};
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn database() -> DatabaseName {
        DatabaseName::new("lush").unwrap()
    }

    fn tables(names: &[&str]) -> Vec<TableName> {
        names.iter().map(|n| TableName::new(*n).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_unified_orders_sections_by_unit() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::unified(dir.path(), database(), 2);

        let mut routines = sink.section(ExportUnit::Routines);
        routines.write(b"routines\n").await.unwrap();
        routines.commit().await.unwrap();

        let mut second = sink.section(ExportUnit::Table(1));
        second.write(b"artist\n").await.unwrap();
        second.commit().await.unwrap();

        let mut structure = sink.section(ExportUnit::Structure);
        structure.write(b"structure\n").await.unwrap();
        structure.commit().await.unwrap();

        let mut first = sink.section(ExportUnit::Table(0));
        first.write(b"album\n").await.unwrap();
        first.commit().await.unwrap();

        let record = sink.finish().await.unwrap().unwrap();
        let contents = std::fs::read_to_string(dir.path().join(UNIFIED_FILE_NAME)).unwrap();
        assert_eq!(
            contents,
            "structure\n\
             USE `lush`;\r\n\r\nalbum\n\
             USE `lush`;\r\n\r\nartist\n\
             USE `lush`;\r\n\r\nroutines\n"
        );
        assert_eq!(record.bytes, contents.len() as u64);
        assert_eq!(record.sha256, format!("{:x}", Sha256::digest(contents.as_bytes())));
    }

    #[tokio::test]
    async fn test_dropped_section_does_not_stall_writer() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::unified(dir.path(), database(), 1);

        let mut structure = sink.section(ExportUnit::Structure);
        structure.write(b"structure\n").await.unwrap();
        structure.commit().await.unwrap();

        let mut routines = sink.section(ExportUnit::Routines);
        routines.write(b"routines\n").await.unwrap();
        routines.commit().await.unwrap();

        let mut table = sink.section(ExportUnit::Table(0));
        table.write(b"half a table\n").await.unwrap();
        drop(table);

        sink.finish().await.unwrap();
        let contents = std::fs::read_to_string(dir.path().join(UNIFIED_FILE_NAME)).unwrap();
        assert_eq!(contents, "structure\nUSE `lush`;\r\n\r\nroutines\n");
    }

    #[tokio::test]
    async fn test_unified_spools_are_removed() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::unified(dir.path(), database(), 1);

        let mut table = sink.section(ExportUnit::Table(0));
        table.write(b"album\n").await.unwrap();
        table.commit().await.unwrap();
        sink.section(ExportUnit::Structure).commit().await.unwrap();
        sink.section(ExportUnit::Routines).commit().await.unwrap();
        sink.finish().await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, [UNIFIED_FILE_NAME]);
    }

    /// Writes `output` and then reports `status`
    struct CannedTool {
        output: &'static [u8],
        status: ProcessOutput,
    }

    #[async_trait]
    impl DumpTool for CannedTool {
        fn name(&self) -> &str {
            "canned"
        }

        async fn dump(
            &self,
            _request: &DumpRequest,
            out: OutputWriter<'_>,
        ) -> Result<ProcessOutput, DumpError> {
            out.write_all(self.output)
                .await
                .map_err(|e| DumpError::Write(e.to_string()))?;
            Ok(self.status.clone())
        }
    }

    #[tokio::test]
    async fn test_dump_from_streams_into_section() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::split(dir.path(), database(), &[]);
        let tool = CannedTool {
            output: b"DELIMITER ;;\nCREATE PROCEDURE p();\n",
            status: ProcessOutput::success(),
        };

        let mut routines = sink.section(ExportUnit::Routines);
        let added = routines.dump_from(&tool, &DumpRequest::Routines).await.unwrap();
        assert_eq!(added, 35);
        assert_eq!(routines.len(), 35 + "USE `lush`;\r\n\r\n".len() as u64);

        let record = routines.commit().await.unwrap().unwrap();
        let contents = std::fs::read_to_string(&record.path).unwrap();
        assert_eq!(contents, "USE `lush`;\r\n\r\nDELIMITER ;;\nCREATE PROCEDURE p();\n");
        assert_eq!(record.bytes, contents.len() as u64);
    }

    #[tokio::test]
    async fn test_failed_dump_output_is_cut_from_section() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::split(dir.path(), database(), &[]);
        let failing = CannedTool {
            output: b"CREATE PROCEDURE half",
            status: ProcessOutput::failed(Some(2), "Lost connection"),
        };

        let mut routines = sink.section(ExportUnit::Routines);
        routines.write(b"-- kept\n").await.unwrap();
        let err = routines
            .dump_from(&failing, &DumpRequest::Routines)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "exit");

        routines.write(b"-- after\n").await.unwrap();
        let record = routines.commit().await.unwrap().unwrap();
        let contents = std::fs::read_to_string(&record.path).unwrap();
        assert_eq!(contents, "USE `lush`;\r\n\r\n-- kept\n-- after\n");
    }

    #[tokio::test]
    async fn test_whole_sink_writes_dump_file_directly() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::whole(dir.path(), database());
        let tool = CannedTool {
            output: b"CREATE DATABASE `lush`;\n",
            status: ProcessOutput::success(),
        };

        let mut section = sink.section(ExportUnit::Structure);
        section
            .dump_from(&tool, &DumpRequest::WholeDatabase)
            .await
            .unwrap();
        let record = section.commit().await.unwrap().unwrap();

        assert_eq!(record.path, dir.path().join(UNIFIED_FILE_NAME));
        assert_eq!(
            std::fs::read_to_string(&record.path).unwrap(),
            "CREATE DATABASE `lush`;\n"
        );
        assert!(sink.finish().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_split_writes_named_files() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::split(dir.path(), database(), &tables(&["album", "artist"]));

        assert_eq!(
            sink.split_path(ExportUnit::Table(1)).unwrap(),
            dir.path().join("2-artist-dump.sql")
        );

        let mut structure = sink.section(ExportUnit::Structure);
        structure.write(b"CREATE TABLE album;\n").await.unwrap();
        let record = structure.commit().await.unwrap().unwrap();
        assert_eq!(record.path, dir.path().join("0-structure-dump.sql"));

        let mut routines = sink.section(ExportUnit::Routines);
        routines.write(b"CREATE PROCEDURE p();\n").await.unwrap();
        let record = routines.commit().await.unwrap().unwrap();
        assert_eq!(record.path, dir.path().join("3-routines-dump.sql"));

        let contents = std::fs::read_to_string(&record.path).unwrap();
        assert_eq!(contents, "USE `lush`;\r\n\r\nCREATE PROCEDURE p();\n");
        assert!(sink.finish().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_split_table_with_slash_stays_in_dir() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::split(dir.path(), database(), &tables(&["../escape/x"]));

        let mut section = sink.section(ExportUnit::Table(0));
        section.write(b"INSERT;\n").await.unwrap();
        let record = section.commit().await.unwrap().unwrap();

        assert_eq!(record.path, dir.path().join("1-.._escape_x-dump.sql"));
        assert_eq!(record.path.parent().unwrap(), dir.path());
        assert!(record.path.exists());
        assert!(!dir.path().parent().unwrap().join("escape").exists());
        assert!(sink.finish().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_split_write_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let sink = ArtifactSink::split(&missing, database(), &[]);

        let err = sink
            .section(ExportUnit::Structure)
            .commit()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "write");
    }

    #[tokio::test]
    async fn test_unified_create_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let sink = ArtifactSink::unified(&dir.path().join("missing"), database(), 0);
        assert!(sink.finish().await.is_err());
    }
}
