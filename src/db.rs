//! The database module
//! Register faces and match probes against the shared embedding index

use log::{debug, error};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::index::SimilarityIndex;
use crate::store::EmbeddingStore;
use crate::vector::l2_norm;

/// Store and index kept in lockstep: row `i` of one is row `i` of the other.
#[derive(Debug, Default)]
struct EmbeddingIndex {
    store: EmbeddingStore,
    index: SimilarityIndex,
}

/// Outcome of a successful [`FaceDB::register`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub row: usize,
    pub label: String,
}

/// Best stored face for a probe. `score` is the cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceMatch {
    pub label: String,
    pub score: f32,
    pub row: usize,
}

/// Snapshot of the database size, taken under one read lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DbStatus {
    pub faces: usize,
    pub unique_identities: usize,
    pub dimension: Option<usize>,
}

/// In-memory face database.
///
/// Embeddings are L2-normalized on registration and matched by dot product
/// (cosine similarity). All methods take `&self`; one reader-writer lock
/// covers the store and the index together, so concurrent matches share the
/// lock and a registration is never half-visible.
#[derive(Debug, Default)]
pub struct FaceDB {
    inner: RwLock<EmbeddingIndex>,
}

impl FaceDB {
    /// Creates an empty database.
    ///
    /// The dimension is fixed by the first registered embedding.
    ///
    /// # Examples
    ///
    /// ```
    /// use facematch::FaceDB;
    ///
    /// let db = FaceDB::new();
    /// assert_eq!(db.count(), 0);
    /// assert_eq!(db.dimension(), None);
    /// ```
    pub fn new() -> FaceDB {
        FaceDB { inner: RwLock::new(EmbeddingIndex::default()) }
    }

    /// Creates an empty database that only accepts embeddings of length `dimension`.
    pub fn with_dimension(dimension: usize) -> FaceDB {
        FaceDB {
            inner: RwLock::new(EmbeddingIndex {
                store: EmbeddingStore::new(),
                index: SimilarityIndex::with_dimension(dimension),
            }),
        }
    }

    /// Registers `label` with a raw embedding.
    ///
    /// The embedding is normalized outside the lock, then appended to the
    /// store and the index under the write lock. Duplicate labels are allowed
    /// and simply add another candidate row.
    ///
    /// # Errors
    ///
    /// * `DegenerateVector` - empty, zero or non-finite embedding
    /// * `DimensionMismatch` - length differs from the established dimension
    ///
    /// # Examples
    ///
    /// ```
    /// use facematch::FaceDB;
    ///
    /// let db = FaceDB::new();
    /// let reg = db.register("alice", &[3.0, 4.0]).unwrap();
    /// assert_eq!(reg.row, 0);
    ///
    /// // Dimension is now 2
    /// assert!(db.register("bob", &[1.0, 2.0, 3.0]).is_err());
    /// // Zero vectors cannot be normalized
    /// assert!(db.register("carol", &[0.0, 0.0]).is_err());
    /// ```
    pub fn register(&self, label: impl Into<String>, embedding: &[f32]) -> Result<Registration> {
        let label = label.into();
        let normalized = l2_norm(embedding)?;

        let mut inner = self.inner.write();
        let EmbeddingIndex { store, index } = &mut *inner;
        index.check_dimension(normalized.len())?;

        // Store first, then index; nothing below can fail
        let row = store.append(label.clone(), normalized.clone());
        let index_row = index.insert(&normalized);
        debug_assert_eq!(row, index_row);
        debug_assert_eq!(store.size(), index.row_count());
        drop(inner);

        debug!("registered '{}' at row {}", label, row);
        Ok(Registration { row, label })
    }

    /// Returns the stored face most similar to `embedding`.
    ///
    /// Ties go to the earliest registration. No threshold is applied: the
    /// true best score is reported and the caller decides what counts as a
    /// match.
    ///
    /// # Errors
    ///
    /// * `EmptyDatabase` - nothing registered yet
    /// * `DimensionMismatch` - length differs from the established dimension
    /// * `DegenerateVector` - the probe cannot be normalized
    ///
    /// # Examples
    ///
    /// ```
    /// use facematch::FaceDB;
    ///
    /// let db = FaceDB::new();
    /// db.register("alice", &[1.0, 0.0, 0.0]).unwrap();
    /// db.register("bob", &[0.0, 1.0, 0.0]).unwrap();
    ///
    /// let best = db.match_face(&[0.9, 0.1, 0.0]).unwrap();
    /// assert_eq!(best.label, "alice");
    /// assert!((best.score - 0.994).abs() < 1e-3);
    /// ```
    pub fn match_face(&self, embedding: &[f32]) -> Result<FaceMatch> {
        let mut found = self.search(embedding, 1)?;
        // search only returns Ok with at least one row when k >= 1
        found.pop().ok_or(MatchError::EmptyIndex)
    }

    /// Top-`k` generalisation of [`match_face`](Self::match_face), by descending score.
    pub fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<FaceMatch>> {
        let inner = self.inner.read();
        if inner.store.size() == 0 {
            return Err(MatchError::EmptyDatabase);
        }
        inner.index.check_dimension(embedding.len())?;

        let query = l2_norm(embedding)?;
        let neighbors = inner.index.nearest(&query, k)?;

        neighbors
            .into_iter()
            .map(|n| -> Result<FaceMatch> {
                let label = inner.store.label_at(n.row).inspect_err(|e| {
                    error!("store/index out of step: {} (index rows: {})", e, inner.index.row_count());
                })?;
                Ok(FaceMatch { label: label.to_string(), score: n.score, row: n.row })
            })
            .collect()
    }

    /// Returns the number of registered faces.
    pub fn count(&self) -> usize {
        self.inner.read().store.size()
    }

    /// Established embedding dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().index.dimension()
    }

    pub fn status(&self) -> DbStatus {
        let inner = self.inner.read();
        DbStatus {
            faces: inner.store.size(),
            unique_identities: inner.store.unique_labels(),
            dimension: inner.index.dimension(),
        }
    }

    /// Checks the row correspondence invariant under a single read lock.
    pub fn is_consistent(&self) -> bool {
        let inner = self.inner.read();
        inner.store.size() == inner.index.row_count()
    }
}
