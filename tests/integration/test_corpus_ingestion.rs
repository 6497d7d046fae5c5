//! Test: corpus file -> store -> snapshot -> policy-filtered answers
//!
//! Mirrors what `autoguru ingest` followed by `autoguru ask` does.

use autoguru::answers::{AnswerPolicy, AnswerStore, load_corpus};
use autoguru::config::Settings;
use autoguru::embedding::{Embedder, FixedEmbedder};
use autoguru::storage::SnapshotPaths;
use autoguru::{AnswerError, ExitCode};
use std::sync::Arc;
use tempfile::TempDir;

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(
        FixedEmbedder::new(2)
            .unwrap()
            .with_label("faq-table")
            .with_entry("How do I get an API key?", vec![0.0, 0.0])
            .unwrap()
            .with_entry("Sign in to the developer portal.", vec![0.5, 0.0])
            .unwrap()
            .with_entry("What are the rate limits?", vec![10.0, 0.0])
            .unwrap()
            .with_entry("20 requests every second.", vec![10.0, 0.5])
            .unwrap()
            .with_entry("Is there a sandbox?", vec![0.0, 10.0])
            .unwrap()
            .with_entry("Yes, use the staging host.", vec![0.5, 10.0])
            .unwrap()
            .with_entry("api key please", vec![1.0, 1.0])
            .unwrap()
            .with_entry("something unrelated", vec![6.0, 6.0])
            .unwrap(),
    )
}

const CORPUS_ARRAY: &str = r#"[
    {"question": "How do I get an API key?", "answer": "Sign in to the developer portal."},
    {"question": "What are the rate limits?", "answer": "20 requests every second."}
]"#;

const CORPUS_THREADS: &str = r#"{"id": 7, "body": "Is there a sandbox?", "answers": [{"id": 8, "body": "Yes, use the staging host.", "accepted": true}]}
{"id": 9, "body": "Anyone?", "answers": []}
"#;

#[test]
fn test_ingest_append_and_ask() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("faq.json");
    let second = temp_dir.path().join("threads.jsonl");
    std::fs::write(&first, CORPUS_ARRAY).unwrap();
    std::fs::write(&second, CORPUS_THREADS).unwrap();

    let settings = Settings::default();
    let paths = SnapshotPaths::from_config(temp_dir.path().join("data"), &settings.storage);

    // First ingest into a fresh store
    let store = AnswerStore::empty(embedder());
    assert_eq!(store.add_answers(load_corpus(&first).unwrap()).unwrap(), 2);
    store.save(&paths).unwrap();

    // Second ingest appends to the saved snapshot
    let store = AnswerStore::load(&paths, embedder()).unwrap();
    assert_eq!(store.add_answers(load_corpus(&second).unwrap()).unwrap(), 1);
    let metadata = store.save(&paths).unwrap();
    assert_eq!(metadata.entry_count, 3);

    let store = AnswerStore::load(&paths, embedder()).unwrap();
    let policy = AnswerPolicy::from_config(&settings.answers);

    let answer = policy.respond(&store, "api key please");
    assert_eq!(answer.content, "Sign in to the developer portal.");
    assert!(policy.accepts(&answer));

    let answer = policy.respond(&store, "Is there a sandbox?");
    assert_eq!(answer.content, "Yes, use the staging host.");
    assert_eq!(answer.confidence, 1.0);

    // Far from everything: nearest is returned raw but the policy falls back
    let raw = store.get_answer("something unrelated").unwrap();
    assert!(raw.confidence < settings.answers.confidence_threshold);
    let answer = policy.respond(&store, "something unrelated");
    assert_eq!(answer.content, settings.answers.fallback_message);
    assert_eq!(answer.confidence, raw.confidence);
}

#[test]
fn test_ask_before_ingest_reports_not_ready() {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path());

    let store = AnswerStore::empty(embedder());
    let error = store.get_answer("api key please").unwrap_err();
    assert!(matches!(error, AnswerError::NotReady));
    assert_eq!(ExitCode::from_error(&error), ExitCode::NotReady);
    assert!(!paths.exists());
}

#[test]
fn test_bad_corpus_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("faq.json");
    std::fs::write(&path, r#"[{"question": "", "answer": "orphan"}]"#).unwrap();

    let error = load_corpus(&path).unwrap_err();
    assert!(matches!(error, AnswerError::Configuration { .. }));
    assert_eq!(ExitCode::from_error(&error), ExitCode::ConfigError);
    assert!(error.to_string().contains("record 1"));
}
