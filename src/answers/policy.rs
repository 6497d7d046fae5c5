//! Confidence thresholding for callers that present answers to people.

use crate::answers::{Answer, AnswerStore};
use crate::config::AnswersConfig;

/// Replaces low-confidence or failed answers with a fallback message.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerPolicy {
    pub confidence_threshold: f32,
    pub fallback_message: String,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self::from_config(&AnswersConfig::default())
    }
}

impl AnswerPolicy {
    pub fn new(confidence_threshold: f32, fallback_message: impl Into<String>) -> Self {
        Self {
            confidence_threshold,
            fallback_message: fallback_message.into(),
        }
    }

    pub fn from_config(config: &AnswersConfig) -> Self {
        Self::new(config.confidence_threshold, config.fallback_message.clone())
    }

    /// Whether `answer` clears the threshold.
    #[must_use]
    pub fn accepts(&self, answer: &Answer) -> bool {
        answer.confidence >= self.confidence_threshold
    }

    /// Keeps `answer` if it clears the threshold, otherwise swaps in the
    /// fallback message. Confidence is left untouched.
    #[must_use]
    pub fn apply(&self, answer: Answer) -> Answer {
        if self.accepts(&answer) {
            answer
        } else {
            Answer {
                content: self.fallback_message.clone(),
                ..answer
            }
        }
    }

    /// Queries `store` and never fails: errors become the fallback answer
    /// with confidence 0.0.
    pub fn respond(&self, store: &AnswerStore, question: &str) -> Answer {
        match store.get_answer(question) {
            Ok(answer) => self.apply(answer),
            Err(error) => {
                tracing::warn!(
                    status = %error.status_code(),
                    "answering '{question}' failed: {error}"
                );
                Answer {
                    content: self.fallback_message.clone(),
                    question: question.to_string(),
                    confidence: 0.0,
                }
            }
        }
    }
}
