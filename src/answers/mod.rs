//! Question answering over a fixed corpus.
//!
//! [`AnswerStore`] embeds recorded questions, indexes them, and answers new
//! questions with the answer of the nearest recorded one. [`AnswerPolicy`]
//! turns low-confidence results into a fallback reply.

mod corpus;
mod policy;
mod store;
mod types;

pub use corpus::{load_corpus, parse_corpus};
pub use policy::AnswerPolicy;
pub use store::{AnswerStore, IndexState, RebuildPolicy, StoreOptions};
pub use types::{Answer, CorpusEntry};
