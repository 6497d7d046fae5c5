use serde::{Deserialize, Serialize};

/// A recorded question and its answer.
///
/// Entries are identified by their position in the store; they are never
/// edited or removed once added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub question: String,
    pub answer: String,
}

impl CorpusEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl<Q: Into<String>, A: Into<String>> From<(Q, A)> for CorpusEntry {
    fn from((question, answer): (Q, A)) -> Self {
        Self::new(question, answer)
    }
}

/// Result of a query.
///
/// `question` is the text that was asked, not the stored question it
/// matched. `confidence` is `1 - distance / max_pairwise_distance`; it can
/// be negative for questions farther from the corpus than any two stored
/// questions are from each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub content: String,
    pub question: String,
    pub confidence: f32,
}
