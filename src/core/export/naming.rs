//! Split-layout artifact naming
//!
//! Every artifact of a split export gets a zero-padded sequence prefix, so
//! the files sort in the order they must be replayed:
//!
//! ```text
//! 00-structure-dump.sql
//! 01-album-dump.sql
//! ...
//! 11-routines-dump.sql
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out fixed-width, strictly increasing sequence prefixes
#[derive(Debug)]
pub struct FileNameAllocator {
    width: usize,
    next: AtomicUsize,
}

impl FileNameAllocator {
    /// Sizes the prefix for `table_count` tables plus structure and routines
    pub fn new(table_count: usize) -> Self {
        Self {
            width: digit_count(table_count + 2),
            next: AtomicUsize::new(0),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the next prefix, starting at zero
    pub fn next_prefix(&self) -> String {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{index:0width$}", width = self.width)
    }

    /// Returns the next full file name for `label`
    pub fn next_file_name(&self, label: &str) -> String {
        artifact_file_name(&self.next_prefix(), label)
    }
}

/// `<prefix>-<label>-dump.sql`
///
/// Table names may legally contain `/` or `\`; those and control characters
/// become `_` so the file stays inside the output directory.
pub fn artifact_file_name(prefix: &str, label: &str) -> String {
    format!("{prefix}-{}-dump.sql", sanitize_label(label))
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn digit_count(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |log| log as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use test_case::test_case;

    #[test_case(0, 1 ; "no tables")]
    #[test_case(7, 1 ; "nine artifacts")]
    #[test_case(8, 2 ; "ten artifacts")]
    #[test_case(97, 2 ; "ninety nine artifacts")]
    #[test_case(98, 3 ; "one hundred artifacts")]
    fn test_width(tables: usize, width: usize) {
        assert_eq!(FileNameAllocator::new(tables).width(), width);
    }

    #[test]
    fn test_sequential_prefixes() {
        let allocator = FileNameAllocator::new(10);
        let prefixes: Vec<String> = (0..12).map(|_| allocator.next_prefix()).collect();
        assert_eq!(prefixes[0], "00");
        assert_eq!(prefixes[1], "01");
        assert_eq!(prefixes[11], "11");
        assert!(prefixes.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_last_prefix_fits_width() {
        let tables = 98;
        let allocator = FileNameAllocator::new(tables);
        let last = (0..tables + 2).map(|_| allocator.next_prefix()).last().unwrap();
        assert_eq!(last, "099");
        assert_eq!(last.len(), allocator.width());
    }

    #[test]
    fn test_file_name() {
        let allocator = FileNameAllocator::new(3);
        assert_eq!(allocator.next_file_name("structure"), "0-structure-dump.sql");
        assert_eq!(allocator.next_file_name("album"), "1-album-dump.sql");
    }

    #[test_case("a/b", "1-a_b-dump.sql" ; "forward slash")]
    #[test_case("../../etc/passwd", "1-.._.._etc_passwd-dump.sql" ; "parent traversal")]
    #[test_case("a\\b", "1-a_b-dump.sql" ; "backslash")]
    #[test_case("tab\tname", "1-tab_name-dump.sql" ; "control character")]
    #[test_case("caf\u{e9}", "1-caf\u{e9}-dump.sql" ; "unicode kept")]
    fn test_label_is_sanitized(label: &str, expected: &str) {
        let name = artifact_file_name("1", label);
        assert_eq!(name, expected);
        assert_eq!(std::path::Path::new(&name).components().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_get_distinct_prefixes() {
        let allocator = Arc::new(FileNameAllocator::new(200));
        let handles: Vec<_> = (0..202)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move { allocator.next_prefix() })
            })
            .collect();

        let mut seen = BTreeSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        let expected: BTreeSet<String> = (0..202).map(|i| format!("{i:03}")).collect();
        assert_eq!(seen, expected);
    }
}
