//! Snapshot persistence for the answer store.
//!
//! A snapshot directory holds:
//! - `metadata.json`: format version, embedder descriptor, counts, timestamps
//! - `entries.jsonl`: corpus entries, one per line, in insertion order
//! - `vectors.bin`: question/answer vector pairs in the same order
//! - `embedder.model`: the embedder's own model data, for backends that have one
//!
//! Entries and vectors are linked only by position. Every file is written to
//! a temporary sibling and renamed into place.

mod entries;
mod metadata;
mod snapshot;

pub use entries::{read_entries, write_entries};
pub use metadata::SnapshotMetadata;
pub use snapshot::{Snapshot, SnapshotPaths, load_snapshot, read_metadata, save_snapshot};

use crate::error::{AnswerError, AnswerResult};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes `contents` to a temporary file next to `path`, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> AnswerResult<()> {
    replace_file(path, contents).map_err(|e| AnswerError::io("write", path, e))
}

/// [`write_atomic`] for callers with their own error type.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("file.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // No temp files left behind
        let siblings = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1);
    }
}
