//! The answer store: corpus, vectors and the derived search index.
//!
//! Entries and vector pairs are kept in two parallel append-only sequences.
//! The search index (k-d tree over question vectors plus the cached maximum
//! pairwise distance) is derived from them and moves through explicit states:
//!
//! - `Empty`: no entries; queries fail with [`AnswerError::NotReady`]
//! - `Dirty`: entries were appended but the index has not been rebuilt yet
//! - `Clean`: the index reflects every entry
//!
//! Mutations embed their texts with no lock held and are serialized on a
//! separate writer mutex. A new index is built from copies of the vectors
//! outside the state lock; the write lock is taken only to append and swap
//! the index `Arc`. Queries clone the current index under a brief read lock
//! and search outside it, so neither a rebuild in progress nor one that
//! completes mid-query holds them up.

use crate::answers::{Answer, CorpusEntry};
use crate::embedding::Embedder;
use crate::error::{AnswerError, AnswerResult};
use crate::storage::{SnapshotMetadata, SnapshotPaths, load_snapshot, save_snapshot};
use crate::vector::{
    DEFAULT_LEAF_SIZE, EmbeddingVector, KdTree, VectorDimension, VectorPair,
    max_pairwise_distance,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

/// When appended entries become searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildPolicy {
    /// Rebuild inside every `add_answer`/`add_answers` call.
    #[default]
    Eager,
    /// Leave the index dirty; the next query (or [`AnswerStore::rebuild`]) rebuilds it.
    Lazy,
}

/// Tuning knobs that do not change query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub leaf_size: usize,
    pub rebuild: RebuildPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            rebuild: RebuildPolicy::Eager,
        }
    }
}

/// Observable state of the derived index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Empty,
    Dirty,
    Clean,
}

/// Immutable search structures for one generation of the corpus.
#[derive(Debug)]
struct SearchIndex {
    tree: KdTree,
    /// Answers in the order the tree was built from.
    answers: Vec<String>,
    max_pairwise_distance: f32,
    generation: u64,
}

impl SearchIndex {
    fn build(
        questions: &[EmbeddingVector],
        answers: Vec<String>,
        leaf_size: usize,
        generation: u64,
    ) -> AnswerResult<Self> {
        if questions.is_empty() {
            return Err(AnswerError::NotReady);
        }
        let tree = KdTree::build(questions, leaf_size)?;
        let max_pairwise_distance = max_pairwise_distance(questions);
        tracing::debug!(
            entries = questions.len(),
            max_pairwise_distance,
            generation,
            "rebuilt answer index"
        );
        Ok(Self {
            tree,
            answers,
            max_pairwise_distance,
            generation,
        })
    }

    /// `1 - distance / max`, with a single distinct point counting as a perfect match.
    fn confidence(&self, distance: f32) -> f32 {
        if self.max_pairwise_distance > 0.0 {
            1.0 - distance / self.max_pairwise_distance
        } else {
            1.0
        }
    }
}

#[derive(Debug)]
enum IndexSlot {
    Empty,
    Dirty,
    Clean(Arc<SearchIndex>),
}

#[derive(Debug)]
struct StoreState {
    entries: Vec<CorpusEntry>,
    vectors: Vec<VectorPair>,
    index: IndexSlot,
    generation: u64,
}

impl StoreState {
    /// Copies of what an index over the current corpus plus `pending` needs.
    fn index_inputs(
        &self,
        pending: &[(CorpusEntry, VectorPair)],
    ) -> (Vec<EmbeddingVector>, Vec<String>) {
        let questions = self
            .vectors
            .iter()
            .chain(pending.iter().map(|(_, pair)| pair))
            .map(|pair| pair.question.clone())
            .collect();
        let answers = self
            .entries
            .iter()
            .chain(pending.iter().map(|(entry, _)| entry))
            .map(|entry| entry.answer.clone())
            .collect();
        (questions, answers)
    }
}

/// Question/answer corpus with nearest-question retrieval.
pub struct AnswerStore {
    embedder: Arc<dyn Embedder>,
    dimension: VectorDimension,
    options: StoreOptions,
    state: RwLock<StoreState>,
    /// Serializes mutations and rebuilds; never held by plain queries.
    writer: Mutex<()>,
}

impl std::fmt::Debug for AnswerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStore")
            .field("embedder", &self.embedder.descriptor())
            .field("dimension", &self.dimension)
            .field("entries", &self.len())
            .field("index", &self.index_state())
            .finish()
    }
}

impl AnswerStore {
    /// Creates an empty store whose vectors are `embedding_size` wide.
    pub fn new(embedder: Arc<dyn Embedder>, embedding_size: usize) -> AnswerResult<Self> {
        Self::construct(embedder, Some(embedding_size), None, None)
    }

    /// Creates an empty store sized to the embedder's output.
    pub fn empty(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self::from_parts(embedder, dimension, StoreOptions::default(), Vec::new(), Vec::new())
    }

    /// Builds a store from exactly one of:
    /// - an `embedding_size` (entries and vectors absent or empty), or
    /// - `entries` and `vectors` of equal length (no `embedding_size`).
    ///
    /// Anything else is a configuration error. A non-empty corpus is indexed
    /// immediately.
    pub fn construct(
        embedder: Arc<dyn Embedder>,
        embedding_size: Option<usize>,
        entries: Option<Vec<CorpusEntry>>,
        vectors: Option<Vec<VectorPair>>,
    ) -> AnswerResult<Self> {
        Self::construct_with(
            StoreOptions::default(),
            embedder,
            embedding_size,
            entries,
            vectors,
        )
    }

    /// [`construct`](Self::construct) with explicit options.
    pub fn construct_with(
        options: StoreOptions,
        embedder: Arc<dyn Embedder>,
        embedding_size: Option<usize>,
        entries: Option<Vec<CorpusEntry>>,
        vectors: Option<Vec<VectorPair>>,
    ) -> AnswerResult<Self> {
        let embedder_dimension = embedder.dimension();

        let (entries, vectors) = match (embedding_size, entries, vectors) {
            (Some(size), entries, vectors)
                if entries.as_ref().is_none_or(Vec::is_empty)
                    && vectors.as_ref().is_none_or(Vec::is_empty) =>
            {
                if size != embedder_dimension.get() {
                    return Err(AnswerError::configuration_with(
                        format!(
                            "embedding_size {size} does not match the embedder's output width {embedder_dimension}"
                        ),
                        "Omit embedding_size or use an embedder of that width",
                    ));
                }
                (Vec::new(), Vec::new())
            }
            (Some(_), _, _) => {
                return Err(AnswerError::configuration(
                    "embedding_size cannot be combined with a non-empty corpus",
                ));
            }
            (None, Some(entries), Some(vectors)) => {
                if entries.len() != vectors.len() {
                    return Err(AnswerError::configuration(format!(
                        "{} entries cannot pair with {} vector pairs",
                        entries.len(),
                        vectors.len()
                    )));
                }
                for (position, pair) in vectors.iter().enumerate() {
                    pair.validate(embedder_dimension).map_err(|e| {
                        AnswerError::configuration(format!("vector pair {position}: {e}"))
                    })?;
                }
                (entries, vectors)
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(AnswerError::configuration(
                    "entries and vectors must either both be provided or both be omitted",
                ));
            }
            (None, None, None) => {
                return Err(AnswerError::configuration(
                    "embedding_size is required when no entries and vectors are provided",
                ));
            }
        };

        let store = Self::from_parts(embedder, embedder_dimension, options, entries, vectors);
        if !store.is_empty() {
            let writer = store.writer.lock();
            store.rebuild_locked(&writer)?;
        }
        Ok(store)
    }

    fn from_parts(
        embedder: Arc<dyn Embedder>,
        dimension: VectorDimension,
        options: StoreOptions,
        entries: Vec<CorpusEntry>,
        vectors: Vec<VectorPair>,
    ) -> Self {
        let index = if vectors.is_empty() {
            IndexSlot::Empty
        } else {
            IndexSlot::Dirty
        };
        Self {
            embedder,
            dimension,
            options: StoreOptions {
                leaf_size: options.leaf_size.max(1),
                ..options
            },
            state: RwLock::new(StoreState {
                entries,
                vectors,
                index,
                generation: 0,
            }),
            writer: Mutex::new(()),
        }
    }

    /// Loads a snapshot produced by an embedder equivalent to `embedder`.
    pub fn load(paths: &SnapshotPaths, embedder: Arc<dyn Embedder>) -> AnswerResult<Self> {
        Self::load_with(paths, embedder, StoreOptions::default())
    }

    pub fn load_with(
        paths: &SnapshotPaths,
        embedder: Arc<dyn Embedder>,
        options: StoreOptions,
    ) -> AnswerResult<Self> {
        let snapshot = load_snapshot(paths, &embedder.descriptor())?;
        Self::construct_with(
            options,
            embedder,
            None,
            Some(snapshot.entries),
            Some(snapshot.vectors),
        )
    }

    /// Writes entries, vectors, embedder model and metadata to `paths`.
    ///
    /// Holds the read lock for the duration so the snapshot is never torn
    /// by a concurrent insert.
    pub fn save(&self, paths: &SnapshotPaths) -> AnswerResult<SnapshotMetadata> {
        let state = self.state.read();
        save_snapshot(paths, self.embedder.as_ref(), &state.entries, &state.vectors)
    }

    /// Embeds and appends one entry.
    pub fn add_answer(
        &self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> AnswerResult<()> {
        self.add_answers(vec![CorpusEntry::new(question, answer)])
            .map(|_| ())
    }

    /// Embeds and appends `entries`, rebuilding the index at most once.
    ///
    /// Every vector is produced and validated, and with eager rebuilds the
    /// new index is built, before the store changes, so a failure anywhere
    /// leaves the store as it was. Queries keep using the previous index
    /// until the new one is swapped in together with the entries.
    /// Returns the number of entries added.
    pub fn add_answers<I>(&self, entries: I) -> AnswerResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<CorpusEntry>,
    {
        let entries: Vec<CorpusEntry> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = entries
            .iter()
            .flat_map(|e| [e.question.as_str(), e.answer.as_str()])
            .collect();
        let mut embedded = self.embed_all(&texts)?.into_iter();

        let mut pending = Vec::with_capacity(entries.len());
        let mut entries = entries.into_iter();
        while let (Some(entry), Some(question), Some(answer)) =
            (entries.next(), embedded.next(), embedded.next())
        {
            pending.push((entry, VectorPair::new(question, answer)));
        }
        let added = pending.len();

        let _writer = self.writer.lock();
        let index = match self.options.rebuild {
            RebuildPolicy::Eager => {
                let (questions, answers, generation) = {
                    let state = self.state.read();
                    let (questions, answers) = state.index_inputs(&pending);
                    (questions, answers, state.generation + 1)
                };
                let index =
                    SearchIndex::build(&questions, answers, self.options.leaf_size, generation)?;
                IndexSlot::Clean(Arc::new(index))
            }
            RebuildPolicy::Lazy => IndexSlot::Dirty,
        };

        let mut state = self.state.write();
        for (entry, pair) in pending {
            state.entries.push(entry);
            state.vectors.push(pair);
        }
        if let IndexSlot::Clean(index) = &index {
            state.generation = index.generation;
        }
        state.index = index;
        debug_assert_eq!(state.entries.len(), state.vectors.len());
        Ok(added)
    }

    /// Answers `question` with the entry whose question vector is nearest.
    pub fn get_answer(&self, question: &str) -> AnswerResult<Answer> {
        if self.is_empty() {
            return Err(AnswerError::NotReady);
        }

        let query = self.embed_all(&[question])?.pop().ok_or(AnswerError::NotReady)?;
        let index = self.current_index()?;
        let nearest = index.tree.nearest(&query)?;
        let content = index
            .answers
            .get(nearest.index)
            .ok_or(AnswerError::NotReady)?
            .clone();

        Ok(Answer {
            content,
            question: question.to_string(),
            confidence: index.confidence(nearest.distance),
        })
    }

    /// Rebuilds a dirty index now. Does nothing for an empty or clean store.
    pub fn rebuild(&self) -> AnswerResult<()> {
        let writer = self.writer.lock();
        if matches!(self.state.read().index, IndexSlot::Dirty) {
            self.rebuild_locked(&writer)?;
        }
        Ok(())
    }

    /// Builds an index over the current corpus and installs it.
    ///
    /// The caller holds the writer lock, so the corpus cannot grow between
    /// copying it and swapping the result in.
    fn rebuild_locked(&self, _writer: &MutexGuard<'_, ()>) -> AnswerResult<Arc<SearchIndex>> {
        let (questions, answers, generation) = {
            let state = self.state.read();
            let (questions, answers) = state.index_inputs(&[]);
            (questions, answers, state.generation + 1)
        };
        let index = match SearchIndex::build(&questions, answers, self.options.leaf_size, generation)
        {
            Ok(index) => Arc::new(index),
            Err(AnswerError::NotReady) => {
                self.state.write().index = IndexSlot::Empty;
                return Err(AnswerError::NotReady);
            }
            Err(error) => return Err(error),
        };

        let mut state = self.state.write();
        state.generation = generation;
        state.index = IndexSlot::Clean(Arc::clone(&index));
        Ok(index)
    }

    /// Clean index snapshot. A dirty index is rebuilt first; queries that
    /// find it dirty wait for that one rebuild.
    fn current_index(&self) -> AnswerResult<Arc<SearchIndex>> {
        match &self.state.read().index {
            IndexSlot::Clean(index) => return Ok(Arc::clone(index)),
            IndexSlot::Empty => return Err(AnswerError::NotReady),
            IndexSlot::Dirty => {}
        }

        let writer = self.writer.lock();
        match &self.state.read().index {
            // Another thread rebuilt it while this one waited
            IndexSlot::Clean(index) => return Ok(Arc::clone(index)),
            IndexSlot::Empty => return Err(AnswerError::NotReady),
            IndexSlot::Dirty => {}
        }
        self.rebuild_locked(&writer)
    }

    /// Embeds `texts` and checks every vector against the store width.
    fn embed_all(&self, texts: &[&str]) -> AnswerResult<Vec<EmbeddingVector>> {
        let vectors = self.embedder.embed_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(AnswerError::EmbeddingFailure(
                crate::vector::VectorError::EmbeddingFailed(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )),
            ));
        }
        for vector in &vectors {
            self.dimension.validate_vector(vector)?;
        }
        Ok(vectors)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Width of every stored vector.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Copy of the corpus in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<CorpusEntry> {
        self.state.read().entries.clone()
    }

    /// Copy of the vector pairs in insertion order.
    #[must_use]
    pub fn vectors(&self) -> Vec<VectorPair> {
        self.state.read().vectors.clone()
    }

    #[must_use]
    pub fn index_state(&self) -> IndexState {
        match self.state.read().index {
            IndexSlot::Empty => IndexState::Empty,
            IndexSlot::Dirty => IndexState::Dirty,
            IndexSlot::Clean(_) => IndexState::Clean,
        }
    }

    /// Number of index rebuilds so far.
    #[must_use]
    pub fn index_generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Cached maximum distance between stored question vectors.
    ///
    /// `None` unless the index is clean.
    #[must_use]
    pub fn max_pairwise_distance(&self) -> Option<f32> {
        match &self.state.read().index {
            IndexSlot::Clean(index) => Some(index.max_pairwise_distance),
            _ => None,
        }
    }

    /// Generation of the index a query would currently use, if clean.
    #[must_use]
    pub fn clean_generation(&self) -> Option<u64> {
        match &self.state.read().index {
            IndexSlot::Clean(index) => Some(index.generation),
            _ => None,
        }
    }
}
