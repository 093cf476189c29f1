//! The embedding store
//! Row-addressable record of (label, normalized vector), in insertion order

use std::collections::HashSet;

use crate::error::{MatchError, Result};

/// One registered face: an identity label and its unit-length embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecord {
    pub label: String,
    pub vector: Vec<f32>,
}

/// Append-only list of face records.
///
/// The store trusts its input: vectors are expected to be normalized and
/// dimension-checked by [`FaceDB`](crate::FaceDB) before they get here.
/// Labels need not be unique; a duplicate label is just another row.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    records: Vec<FaceRecord>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Appends a record and returns its row position.
    pub fn append(&mut self, label: String, vector: Vec<f32>) -> usize {
        self.records.push(FaceRecord { label, vector });
        self.records.len() - 1
    }

    /// Label stored at `row`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `row` was never appended.
    pub fn label_at(&self, row: usize) -> Result<&str> {
        self.record_at(row).map(|r| r.label.as_str())
    }

    pub fn record_at(&self, row: usize) -> Result<&FaceRecord> {
        self.records.get(row).ok_or(MatchError::IndexOutOfRange {
            row,
            len: self.records.len(),
        })
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct labels.
    pub fn unique_labels(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.label.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
