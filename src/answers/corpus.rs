//! Corpus file parsing.
//!
//! A corpus file is either a JSON array or JSON Lines. Each record is one of:
//! - `{"question": "...", "answer": "..."}`
//! - a scraped forum thread `{"body": "...", "answers": [{"body": "...", "accepted": true}]}`,
//!   which yields its accepted answer, or the first answer when none is accepted
//!
//! Threads without answers are skipped. Blank questions or answers are
//! rejected with the record's position.

use crate::answers::CorpusEntry;
use crate::error::{AnswerError, AnswerResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ThreadAnswer {
    body: String,
    #[serde(default)]
    accepted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusRecord {
    Pair { question: String, answer: String },
    Thread { body: String, answers: Vec<ThreadAnswer> },
}

impl CorpusRecord {
    fn into_entry(self) -> Option<CorpusEntry> {
        match self {
            Self::Pair { question, answer } => Some(CorpusEntry::new(question, answer)),
            Self::Thread { body, mut answers } => {
                let chosen = answers
                    .iter()
                    .position(|a| a.accepted)
                    .or((!answers.is_empty()).then_some(0))?;
                Some(CorpusEntry::new(body, answers.swap_remove(chosen).body))
            }
        }
    }
}

/// Reads a corpus file.
pub fn load_corpus(path: &Path) -> AnswerResult<Vec<CorpusEntry>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| AnswerError::io("read corpus", path, e))?;
    let entries = parse_corpus(&content).map_err(|reason| {
        AnswerError::configuration_with(
            format!("{}: {reason}", path.display()),
            "Corpus records look like {\"question\": \"...\", \"answer\": \"...\"}",
        )
    })?;

    tracing::info!(entries = entries.len(), "read corpus from {}", path.display());
    Ok(entries)
}

/// Parses corpus text. Errors name the offending record.
pub fn parse_corpus(content: &str) -> Result<Vec<CorpusEntry>, String> {
    let records: Vec<(String, CorpusRecord)> = if content.trim_start().starts_with('[') {
        let records: Vec<CorpusRecord> =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON array: {e}"))?;
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| (format!("record {}", i + 1), record))
            .collect()
    } else {
        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = serde_json::from_str(line)
                .map_err(|e| format!("line {}: {e}", line_no + 1))?;
            records.push((format!("line {}", line_no + 1), record));
        }
        records
    };

    let mut entries = Vec::with_capacity(records.len());
    for (position, record) in records {
        let Some(entry) = record.into_entry() else {
            tracing::debug!("{position}: thread has no answers, skipping");
            continue;
        };
        if entry.question.trim().is_empty() {
            return Err(format!("{position}: question is blank"));
        }
        if entry.answer.trim().is_empty() {
            return Err(format!("{position}: answer is blank"));
        }
        entries.push(entry);
    }
    Ok(entries)
}
