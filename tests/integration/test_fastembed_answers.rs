//! Test: answers over real sentence embeddings
//!
//! Needs the default sentence model, which is downloaded on first use.
//! Run with `cargo test -- --ignored`.

use autoguru::answers::{AnswerPolicy, AnswerStore};
use autoguru::config::EmbeddingConfig;
use autoguru::create_embedder;

#[test]
#[ignore = "Downloads the sentence embedding model"]
fn test_paraphrased_questions_find_their_answers() {
    let embedder = create_embedder(&EmbeddingConfig::default(), None).unwrap();
    let store = AnswerStore::empty(embedder);
    store
        .add_answers([
            (
                "How do I get a developer API key?",
                "Sign in to the developer portal and copy the key from your dashboard.",
            ),
            (
                "What are the rate limits for production keys?",
                "Production keys allow 500 requests every 10 seconds.",
            ),
            (
                "Why does the match history endpoint return 404?",
                "Matches older than two years are no longer served.",
            ),
            (
                "Is there a sandbox environment for testing?",
                "Yes, point your client at the staging host.",
            ),
        ])
        .unwrap();

    let cases = [
        ("where can I obtain an api key", "Sign in to the developer portal"),
        ("how many requests per second can I make", "500 requests"),
        ("old games give me not found errors", "two years"),
        ("can I test against a staging server", "staging host"),
    ];
    for (question, expected) in cases {
        let answer = store.get_answer(question).unwrap();
        assert!(
            answer.content.contains(expected),
            "'{question}' got '{}'",
            answer.content
        );
        assert!(answer.confidence <= 1.0);
    }

    // Batched and single embeddings may differ in the last bits
    let policy = AnswerPolicy::default();
    let answer = policy.respond(&store, "Is there a sandbox environment for testing?");
    assert!(answer.confidence > 0.99);
    assert!(answer.content.starts_with("Yes"));
}
