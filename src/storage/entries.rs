//! JSON Lines file of corpus entries.
//!
//! One `{"question": .., "answer": ..}` object per line, in insertion order.
//! Line `n` pairs with vector `n` of the vector file.

use crate::answers::CorpusEntry;
use crate::error::{AnswerError, AnswerResult};
use crate::storage::write_atomic;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// Writes `entries` in order, replacing any existing file.
pub fn write_entries(path: &Path, entries: &[CorpusEntry]) -> AnswerResult<()> {
    let mut buffer = Vec::with_capacity(entries.len() * 64);
    for entry in entries {
        serde_json::to_writer(&mut buffer, entry).map_err(|e| {
            AnswerError::corrupt(path, format!("Failed to serialize entry: {e}"))
        })?;
        buffer.push(b'\n');
    }
    write_atomic(path, &buffer)
}

/// Reads every entry in file order. Blank lines are ignored.
pub fn read_entries(path: &Path) -> AnswerResult<Vec<CorpusEntry>> {
    let file = File::open(path).map_err(|e| AnswerError::io("read entries", path, e))?;

    let mut entries = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => {
                AnswerError::corrupt(path, format!("line {}: not valid UTF-8", line_no + 1))
            }
            _ => AnswerError::io("read entries", path, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: CorpusEntry = serde_json::from_str(&line).map_err(|e| {
            AnswerError::corrupt(path, format!("line {}: {e}", line_no + 1))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
