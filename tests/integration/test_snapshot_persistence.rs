//! Test: snapshots round-trip and refuse mismatched models
//!
//! Covers both backends that store their own model data: the lookup table
//! and averaged word vectors.

use autoguru::answers::AnswerStore;
use autoguru::config::{EmbeddingConfig, StorageConfig};
use autoguru::embedding::{Embedder, EmbeddingBackend, FixedEmbedder};
use autoguru::storage::{SnapshotPaths, read_metadata, write_entries};
use autoguru::{AnswerError, CorpusEntry, create_embedder};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "api", "key", "reset", "rate", "limit", "champion", "match", "history", "region", "token",
];

/// Deterministic GloVe-format vocabulary of the given width.
fn write_vocabulary(path: &Path, width: usize) {
    let mut content = String::new();
    for (w, word) in WORDS.iter().enumerate() {
        write!(content, "{word}").unwrap();
        for i in 0..width {
            let value = (((w * 31 + i * 7) % 17) as f32 - 8.0) / 8.0;
            write!(content, " {value}").unwrap();
        }
        content.push('\n');
    }
    std::fs::write(path, content).unwrap();
}

fn word_vector_config(model_path: &Path) -> EmbeddingConfig {
    EmbeddingConfig {
        backend: EmbeddingBackend::WordVectors,
        model: "glove".to_string(),
        model_path: Some(model_path.to_path_buf()),
        ..EmbeddingConfig::default()
    }
}

fn faq() -> Vec<CorpusEntry> {
    vec![
        CorpusEntry::new("How do I reset my API key?", "Reset the key on the portal."),
        CorpusEntry::new("What is the rate limit?", "The limit is 20 per token."),
        CorpusEntry::new("Where is match history?", "Use the match history endpoint."),
        CorpusEntry::new("Which region token?", "Any region token works."),
    ]
}

const QUERIES: &[&str] = &[
    "reset key",
    "rate limit please",
    "match history for my region",
    "champion",
    "api token",
];

#[test]
fn test_save_then_load_answers_identically() {
    let temp_dir = TempDir::new().unwrap();
    let vocabulary = temp_dir.path().join("glove.txt");
    write_vocabulary(&vocabulary, 25);
    let paths = SnapshotPaths::in_dir(temp_dir.path().join("data"));

    let embedder = create_embedder(&word_vector_config(&vocabulary), None).unwrap();
    let store = AnswerStore::empty(embedder);
    store.add_answers(faq()).unwrap();
    let metadata = store.save(&paths).unwrap();
    assert_eq!(metadata.entry_count, 4);

    // Reload through the model saved in the snapshot, not the original file
    std::fs::remove_file(&vocabulary).unwrap();
    let config = EmbeddingConfig {
        model_path: None,
        ..word_vector_config(&vocabulary)
    };
    let embedder = create_embedder(&config, Some(paths.model_path())).unwrap();
    let loaded = AnswerStore::load(&paths, embedder).unwrap();

    assert_eq!(loaded.entries(), store.entries());
    assert_eq!(loaded.vectors(), store.vectors());
    for question in QUERIES {
        let before = store.get_answer(question).unwrap();
        let after = loaded.get_answer(question).unwrap();
        assert_eq!(before.content, after.content, "query {question}");
        assert!((before.confidence - after.confidence).abs() < 1e-6);
    }
}

#[test]
fn test_loading_with_wider_model_is_corrupt_storage() {
    let temp_dir = TempDir::new().unwrap();
    let narrow = temp_dir.path().join("glove-25.txt");
    let wide = temp_dir.path().join("glove-300.txt");
    write_vocabulary(&narrow, 25);
    write_vocabulary(&wide, 300);
    let paths = SnapshotPaths::in_dir(temp_dir.path().join("data"));

    let store = AnswerStore::empty(create_embedder(&word_vector_config(&narrow), None).unwrap());
    store.add_answers(faq()).unwrap();
    store.save(&paths).unwrap();

    let wide_embedder = create_embedder(&word_vector_config(&wide), None).unwrap();
    assert_eq!(wide_embedder.dimension().get(), 300);

    let result = AnswerStore::load(&paths, wide_embedder);
    assert!(
        matches!(result, Err(AnswerError::CorruptStorage { .. })),
        "{result:?}"
    );
}

#[test]
fn test_loading_with_different_model_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path());

    let original: Arc<dyn Embedder> = Arc::new(
        FixedEmbedder::new(2)
            .unwrap()
            .with_label("table-a")
            .with_default(vec![1.0, 1.0])
            .unwrap(),
    );
    let store = AnswerStore::empty(original);
    store.add_answer("hi", "hello").unwrap();
    store.save(&paths).unwrap();

    let other: Arc<dyn Embedder> = Arc::new(FixedEmbedder::new(2).unwrap().with_label("table-b"));
    assert!(matches!(
        AnswerStore::load(&paths, other),
        Err(AnswerError::Configuration { .. })
    ));
}

#[test]
fn test_count_disagreement_is_corrupt_storage() {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path());
    let embedder: Arc<dyn Embedder> = Arc::new(
        FixedEmbedder::new(2)
            .unwrap()
            .with_default(vec![0.5, 0.5])
            .unwrap(),
    );

    let store = AnswerStore::empty(Arc::clone(&embedder));
    store
        .add_answers([("hi", "hello"), ("bye", "goodbye")])
        .unwrap();
    store.save(&paths).unwrap();

    let mut entries = store.entries();
    entries.push(CorpusEntry::new("extra", "line"));
    write_entries(&paths.entries, &entries).unwrap();

    assert!(matches!(
        AnswerStore::load(&paths, embedder),
        Err(AnswerError::CorruptStorage { .. })
    ));
}

#[test]
fn test_truncated_vector_file_is_corrupt_storage() {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path());
    let embedder: Arc<dyn Embedder> = Arc::new(
        FixedEmbedder::new(2)
            .unwrap()
            .with_default(vec![0.5, 0.5])
            .unwrap(),
    );

    let store = AnswerStore::empty(Arc::clone(&embedder));
    store.add_answer("hi", "hello").unwrap();
    store.save(&paths).unwrap();

    let bytes = std::fs::read(&paths.vectors).unwrap();
    std::fs::write(&paths.vectors, &bytes[..bytes.len() - 3]).unwrap();

    assert!(matches!(
        AnswerStore::load(&paths, embedder),
        Err(AnswerError::CorruptStorage { .. })
    ));
}

#[test]
fn test_changed_stopwords_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let vocabulary = temp_dir.path().join("glove.txt");
    write_vocabulary(&vocabulary, 25);
    let paths = SnapshotPaths::in_dir(temp_dir.path().join("data"));

    let store = AnswerStore::empty(create_embedder(&word_vector_config(&vocabulary), None).unwrap());
    store.add_answers(faq()).unwrap();
    store.save(&paths).unwrap();

    let same = create_embedder(&word_vector_config(&vocabulary), None).unwrap();
    assert!(AnswerStore::load(&paths, same).is_ok());

    let config = EmbeddingConfig {
        stopwords: vec!["the".to_string(), "api".to_string()],
        ..word_vector_config(&vocabulary)
    };
    let changed = create_embedder(&config, None).unwrap();
    let result = AnswerStore::load(&paths, changed);
    assert!(
        matches!(result, Err(AnswerError::Configuration { .. })),
        "{result:?}"
    );
}

/// Saves a two-entry snapshot, then lets `corrupt` rewrite the vector file.
fn load_after_corrupting(corrupt: impl FnOnce(&mut Vec<u8>)) -> Result<AnswerStore, AnswerError> {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path());
    let embedder: Arc<dyn Embedder> = Arc::new(
        FixedEmbedder::new(2)
            .unwrap()
            .with_entry("hi", vec![0.0, 0.0])
            .unwrap()
            .with_default(vec![1.0, 1.0])
            .unwrap(),
    );

    let store = AnswerStore::empty(Arc::clone(&embedder));
    store
        .add_answers([("hi", "hello"), ("bye", "goodbye")])
        .unwrap();
    store.save(&paths).unwrap();

    let mut bytes = std::fs::read(&paths.vectors).unwrap();
    corrupt(&mut bytes);
    std::fs::write(&paths.vectors, &bytes).unwrap();

    AnswerStore::load(&paths, embedder)
}

#[test]
fn test_corrupted_vector_header_is_corrupt_storage() {
    // Width and count so large their byte size overflows
    let result = load_after_corrupting(|bytes| {
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
    });
    assert!(
        matches!(result, Err(AnswerError::CorruptStorage { .. })),
        "{result:?}"
    );

    // Zero width
    let result = load_after_corrupting(|bytes| bytes[8..12].copy_from_slice(&0u32.to_le_bytes()));
    match result {
        Err(AnswerError::CorruptStorage { path, .. }) => {
            assert!(path.ends_with("vectors.bin"), "{}", path.display());
        }
        other => panic!("expected corrupt storage, got {other:?}"),
    }
}

#[test]
fn test_non_finite_vector_is_corrupt_storage() {
    let result =
        load_after_corrupting(|bytes| bytes[16..20].copy_from_slice(&f32::NAN.to_le_bytes()));
    assert!(
        matches!(result, Err(AnswerError::CorruptStorage { .. })),
        "{result:?}"
    );

    let result = load_after_corrupting(|bytes| {
        let end = bytes.len();
        bytes[end - 4..].copy_from_slice(&f32::INFINITY.to_le_bytes());
    });
    assert!(
        matches!(result, Err(AnswerError::CorruptStorage { .. })),
        "{result:?}"
    );
}

#[test]
fn test_missing_snapshot_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let paths = SnapshotPaths::in_dir(temp_dir.path().join("nothing-here"));
    let embedder: Arc<dyn Embedder> = Arc::new(FixedEmbedder::new(2).unwrap());

    assert!(!paths.exists());
    assert!(matches!(
        AnswerStore::load(&paths, embedder),
        Err(AnswerError::Io { .. })
    ));
}

#[test]
fn test_custom_file_names_and_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let storage = StorageConfig {
        entries_file: "faq.jsonl".to_string(),
        vectors_file: "faq.vec".to_string(),
        metadata_file: "faq.meta.json".to_string(),
        model_file: "faq.model".to_string(),
    };
    let paths = SnapshotPaths::from_config(temp_dir.path(), &storage);

    let embedder = Arc::new(
        FixedEmbedder::new(3)
            .unwrap()
            .with_label("demo")
            .with_default(vec![1.0, 2.0, 3.0])
            .unwrap(),
    );
    let store = AnswerStore::empty(embedder.clone());
    store.add_answers(faq()).unwrap();
    store.save(&paths).unwrap();

    for name in ["faq.jsonl", "faq.vec", "faq.meta.json", "faq.model"] {
        assert!(temp_dir.path().join(name).exists(), "{name} missing");
    }

    let metadata = read_metadata(&paths).unwrap();
    assert_eq!(metadata.entry_count, 4);
    assert_eq!(metadata.embedder, embedder.descriptor());

    let reloaded_model = FixedEmbedder::load(&paths.model, "demo").unwrap();
    let loaded = AnswerStore::load(&paths, Arc::new(reloaded_model)).unwrap();
    assert_eq!(loaded.len(), 4);
}
