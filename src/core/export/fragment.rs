//! Fragment dumping and lock stitching
//!
//! A filtered table is dumped in several fragments, one per clause. Each
//! dump brackets its rows with `LOCK TABLES ... WRITE;` and
//! `UNLOCK TABLES;`. When the fragments are written back to back, only one
//! lock and one unlock may survive:
//!
//! ```text
//! fragment 1/3:  LOCK  rows            (unlock and trailer cut)
//! fragment 2/3:        rows            (lock removed, unlock and trailer cut)
//! fragment 3/3:        rows  UNLOCK    (lock removed)
//! ```
//!
//! [`LockBracket`] tracks which statements have actually been written, so
//! a failed fragment shifts the lock to the next fragment that succeeds and
//! a failed last fragment still gets its bracket closed.
//!
//! Statements are matched as whole lines, so a table whose name merely
//! contains another table's name is never touched.

use super::sink::ArtifactSection;
use crate::adapters::dump::{DumpRequest, DumpTool};
use crate::domain::{DumpError, TableName};
use std::sync::Arc;

const UNLOCK_STATEMENT: &[u8] = b"UNLOCK TABLES;";

/// A fragment's 1-based place among its table's fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentPosition {
    index: usize,
    total: usize,
}

impl FragmentPosition {
    /// `index` runs from 1 to `total`
    pub fn new(index: usize, total: usize) -> Self {
        debug_assert!(index >= 1 && index <= total);
        Self { index, total }
    }

    /// The position of a table dumped in one piece
    pub fn only() -> Self {
        Self::new(1, 1)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_first(&self) -> bool {
        self.index == 1
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}

/// Lock/unlock state of one table whose fragments share an artifact
#[derive(Debug)]
pub struct LockBracket {
    table: TableName,
    lock: String,
    total: usize,
    locked: bool,
    unlocked: bool,
}

impl LockBracket {
    pub fn new(table: &TableName, total: usize) -> Self {
        Self {
            table: table.clone(),
            lock: format!("LOCK TABLES {} WRITE;", table.quoted()),
            total,
            locked: false,
            unlocked: false,
        }
    }

    /// Applies the lock/unlock rules to the output of a successful fragment
    ///
    /// The first fragment to reach the artifact keeps its lock, every later
    /// one loses it. Only the last fragment keeps its unlock and trailer.
    /// Output of a single-fragment table is returned unchanged.
    pub fn stitch(&mut self, output: Vec<u8>, position: FragmentPosition) -> Vec<u8> {
        if self.total <= 1 {
            return output;
        }

        let lines: Vec<&[u8]> = output.split_inclusive(|byte| *byte == b'\n').collect();
        let end = if position.is_last() {
            lines.len()
        } else {
            lines
                .iter()
                .rposition(|line| statement(line) == UNLOCK_STATEMENT)
                .unwrap_or(lines.len())
        };

        let mut kept = Vec::with_capacity(output.len());
        for line in &lines[..end] {
            let current = statement(line);
            if current == self.lock.as_bytes() {
                if self.locked {
                    continue;
                }
                self.locked = true;
            } else if current == UNLOCK_STATEMENT {
                self.unlocked = true;
            }
            kept.extend_from_slice(line);
        }
        kept
    }

    /// Statements closing a bracket whose last fragment never arrived
    ///
    /// `None` when no lock was written or the unlock already was.
    pub fn finish(&self) -> Option<Vec<u8>> {
        if self.total <= 1 || !self.locked || self.unlocked {
            return None;
        }
        Some(
            format!(
                "/*!40000 ALTER TABLE {} ENABLE KEYS */;\nUNLOCK TABLES;\n",
                self.table.quoted()
            )
            .into_bytes(),
        )
    }
}

/// Runs one data-only dump per fragment
#[derive(Clone)]
pub struct FragmentDumper {
    tool: Arc<dyn DumpTool>,
}

impl FragmentDumper {
    pub fn new(tool: Arc<dyn DumpTool>) -> Self {
        Self { tool }
    }

    fn request(table: &TableName, clause: Option<&str>) -> DumpRequest {
        DumpRequest::TableData {
            table: table.clone(),
            clause: clause.map(str::to_string),
        }
    }

    /// Dumps the rows of `table` matching `clause` (all rows when `None`)
    /// and stitches them into `bracket`
    ///
    /// The fragment is held in memory until it is stitched. On failure
    /// nothing of its output is returned and `bracket` is left untouched.
    pub async fn dump(
        &self,
        table: &TableName,
        clause: Option<&str>,
        position: FragmentPosition,
        bracket: &mut LockBracket,
    ) -> Result<Vec<u8>, DumpError> {
        let mut stdout = Vec::new();
        self.tool
            .dump(&Self::request(table, clause), &mut stdout)
            .await?
            .into_result(self.tool.name())?;
        Ok(bracket.stitch(stdout, position))
    }

    /// Streams the only fragment of `table` straight into `section`
    ///
    /// Returns the number of bytes written.
    pub async fn stream(
        &self,
        table: &TableName,
        clause: Option<&str>,
        section: &mut ArtifactSection,
    ) -> Result<u64, DumpError> {
        section
            .dump_from(self.tool.as_ref(), &Self::request(table, clause))
            .await
    }
}

fn statement(line: &[u8]) -> &[u8] {
    line.trim_ascii()
}
