//! Test: retrieval behavior of the answer store
//!
//! Uses a lookup-table embedder so every distance is known exactly.

use autoguru::answers::{AnswerStore, CorpusEntry, IndexState};
use autoguru::embedding::{Embedder, FixedEmbedder};
use autoguru::vector::euclidean_distance;
use autoguru::AnswerError;
use std::sync::Arc;

fn grid_embedder() -> Arc<dyn Embedder> {
    let mut embedder = FixedEmbedder::new(2).unwrap();
    for x in 0..10 {
        for y in 0..10 {
            let text = format!("q{x}{y}");
            embedder.insert(text, vec![x as f32, y as f32]).unwrap();
            embedder
                .insert(format!("a{x}{y}"), vec![y as f32, x as f32])
                .unwrap();
        }
    }
    embedder.insert("hi", vec![0.0, 0.0]).unwrap();
    embedder.insert("hello", vec![0.0, 0.0]).unwrap();
    embedder.insert("bye", vec![10.0, 10.0]).unwrap();
    embedder.insert("goodbye", vec![10.0, 10.0]).unwrap();
    embedder.insert("nine nine", vec![9.0, 9.0]).unwrap();
    Arc::new(embedder)
}

fn grid_corpus() -> Vec<CorpusEntry> {
    // Sparse subset so queries land between stored points
    (0..10)
        .step_by(3)
        .flat_map(|x| (0..10).step_by(2).map(move |y| (x, y)))
        .map(|(x, y)| CorpusEntry::new(format!("q{x}{y}"), format!("a{x}{y}")))
        .collect()
}

#[test]
fn test_hi_bye_scenario() {
    let store = AnswerStore::new(grid_embedder(), 2).unwrap();
    store
        .add_answers([("hi", "hello"), ("bye", "goodbye")])
        .unwrap();

    let answer = store.get_answer("hi").unwrap();
    assert_eq!(answer.content, "hello");
    assert_eq!(answer.confidence, 1.0);

    // [9,9] is ~1.41 from "bye" and the corpus spans ~14.14
    let answer = store.get_answer("nine nine").unwrap();
    assert_eq!(answer.content, "goodbye");
    assert!(answer.confidence < 1.0);
    assert!((answer.confidence - 0.9).abs() < 1e-4);

    let max = store.max_pairwise_distance().unwrap();
    assert!((max - 200f32.sqrt()).abs() < 1e-4);
}

#[test]
fn test_answer_matches_nearest_entry() {
    let embedder = grid_embedder();
    let corpus = grid_corpus();
    let store = AnswerStore::empty(Arc::clone(&embedder));
    store.add_answers(corpus.clone()).unwrap();

    for x in 0..10 {
        for y in 0..10 {
            let query_text = format!("q{x}{y}");
            let query = embedder.embed(&query_text).unwrap();
            let answer = store.get_answer(&query_text).unwrap();

            // Brute force: first entry at minimum distance
            let (best, distance) = corpus
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    let stored = embedder.embed(&entry.question).unwrap();
                    (i, euclidean_distance(&query, &stored))
                })
                .fold((usize::MAX, f32::INFINITY), |acc, (i, d)| {
                    if d < acc.1 { (i, d) } else { acc }
                });

            assert_eq!(answer.content, corpus[best].answer, "query_text {query_text}");
            let expected = 1.0 - distance / store.max_pairwise_distance().unwrap();
            assert!((answer.confidence - expected).abs() < 1e-5);
        }
    }
}

#[test]
fn test_batch_and_incremental_are_equivalent() {
    let embedder = grid_embedder();
    let corpus = grid_corpus();

    let batch = AnswerStore::empty(Arc::clone(&embedder));
    batch.add_answers(corpus.clone()).unwrap();

    let incremental = AnswerStore::empty(Arc::clone(&embedder));
    for entry in &corpus {
        incremental
            .add_answer(entry.question.clone(), entry.answer.clone())
            .unwrap();
    }

    assert_eq!(batch.entries(), incremental.entries());
    assert_eq!(batch.vectors(), incremental.vectors());
    assert_eq!(batch.index_generation(), 1);
    assert_eq!(incremental.index_generation(), corpus.len() as u64);

    for x in 0..10 {
        for y in 0..10 {
            let query_text = format!("q{x}{y}");
            assert_eq!(
                batch.get_answer(&query_text).unwrap(),
                incremental.get_answer(&query_text).unwrap()
            );
        }
    }
}

#[test]
fn test_empty_store_is_not_ready() {
    let store = AnswerStore::new(grid_embedder(), 2).unwrap();
    assert_eq!(store.index_state(), IndexState::Empty);
    assert!(matches!(store.get_answer("hi"), Err(AnswerError::NotReady)));

    // An empty batch changes nothing
    assert_eq!(store.add_answers(Vec::<CorpusEntry>::new()).unwrap(), 0);
    assert!(matches!(store.get_answer("hi"), Err(AnswerError::NotReady)));
}

#[test]
fn test_single_entry_always_answers_with_full_confidence() {
    let store = AnswerStore::new(grid_embedder(), 2).unwrap();
    store.add_answer("q55", "a55").unwrap();

    for query_text in ["q00", "q55", "q99", "hi"] {
        let answer = store.get_answer(query_text).unwrap();
        assert_eq!(answer.content, "a55");
        assert_eq!(answer.confidence, 1.0);
    }
}

#[test]
fn test_entries_and_vectors_stay_parallel() {
    let store = AnswerStore::empty(grid_embedder());
    store.add_answers(grid_corpus()).unwrap();
    let _ = store.add_answers([("q11", "a11"), ("not embeddable", "a")]);
    store.add_answer("q22", "a22").unwrap();

    assert_eq!(store.len(), grid_corpus().len() + 1);
    assert_eq!(store.entries().len(), store.vectors().len());
}
