//! The similarity index
//! Exact nearest-neighbor search by inner product over normalized vectors

use crate::error::{MatchError, Result};
use crate::vector::dot_product;

/// A scored row returned by [`SimilarityIndex::nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub score: f32,
}

/// Flat brute-force index.
///
/// Rows are stored contiguously as `[r0_d0, r0_d1, ..., r1_d0, ...]`. The
/// dimension is either fixed up front or taken from the first inserted row,
/// and never changes afterwards.
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    vectors: Vec<f32>,
    dimension: Option<usize>,
    rows: usize,
}

impl SimilarityIndex {
    /// Creates an empty index whose dimension is set by the first insert.
    pub fn new() -> Self {
        Self { vectors: Vec::new(), dimension: None, rows: 0 }
    }

    /// Creates an empty index that only accepts vectors of length `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { vectors: Vec::new(), dimension: Some(dimension), rows: 0 }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Checks that a vector of length `len` may be inserted or queried.
    pub fn check_dimension(&self, len: usize) -> Result<()> {
        match self.dimension {
            Some(d) if d != len => Err(MatchError::DimensionMismatch { expected: d, actual: len }),
            _ => Ok(()),
        }
    }

    /// Appends `vector` as a new row and returns the row index.
    ///
    /// Callers must have passed the vector through [`check_dimension`](Self::check_dimension)
    /// first; insert itself never fails so that it can follow a store append
    /// without leaving the two out of step.
    pub fn insert(&mut self, vector: &[f32]) -> usize {
        debug_assert!(self.check_dimension(vector.len()).is_ok());
        if self.dimension.is_none() {
            self.dimension = Some(vector.len());
        }

        self.vectors.extend_from_slice(vector);
        self.rows += 1;
        self.rows - 1
    }

    /// Returns up to `k` rows with the highest dot product against `query`,
    /// by descending score. Equal scores keep the earlier-inserted row first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.rows == 0 {
            return Err(MatchError::EmptyIndex);
        }
        self.check_dimension(query.len())?;

        if k == 0 {
            return Ok(Vec::new());
        }
        // Never more results than rows, whatever the caller asked for
        let k = k.min(self.rows);

        let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
        for row in 0..self.rows {
            let score = dot_product(self.row(row), query)?;
            // `>=` places a new row after existing equal scores, so the lower row wins ties
            let at = best.partition_point(|n| n.score >= score);
            if at < k {
                best.insert(at, Neighbor { row, score });
                best.truncate(k);
            }
        }

        Ok(best)
    }

    /// Slice of the flat array holding `row`.
    fn row(&self, row: usize) -> &[f32] {
        let dim = self.dimension.unwrap_or(0);
        let start = row * dim;
        &self.vectors[start..start + dim]
    }
}

#[cfg(test)]
mod index_test {
    use super::*;
    use crate::vector::l2_norm;

    fn unit(v: &[f32]) -> Vec<f32> {
        l2_norm(v).unwrap()
    }

    #[test]
    fn test_insert_sets_dimension() {
        let mut index = SimilarityIndex::new();
        assert_eq!(index.dimension(), None);

        assert_eq!(index.insert(&unit(&[1.0, 2.0, 3.0])), 0);
        assert_eq!(index.insert(&unit(&[3.0, 2.0, 1.0])), 1);

        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.row_count(), 2);
        assert_eq!(index.vectors.len(), 6);
    }

    #[test]
    fn test_check_dimension() {
        let mut index = SimilarityIndex::new();
        assert!(index.check_dimension(7).is_ok());

        index.insert(&unit(&[1.0, 0.0]));
        assert!(index.check_dimension(2).is_ok());
        assert_eq!(
            index.check_dimension(3).unwrap_err(),
            MatchError::DimensionMismatch { expected: 2, actual: 3 }
        );
    }

    #[test]
    fn test_fixed_dimension() {
        let index = SimilarityIndex::with_dimension(128);
        assert_eq!(index.dimension(), Some(128));
        assert!(index.check_dimension(3).is_err());
    }

    #[test]
    fn test_nearest_empty() {
        let index = SimilarityIndex::new();
        assert_eq!(index.nearest(&[1.0], 1).unwrap_err(), MatchError::EmptyIndex);
    }

    #[test]
    fn test_nearest_dimension_mismatch() {
        let mut index = SimilarityIndex::new();
        index.insert(&unit(&[1.0, 0.0, 0.0]));

        let err = index.nearest(&[1.0, 0.0], 1).unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_nearest_orders_by_score() {
        let mut index = SimilarityIndex::new();
        index.insert(&unit(&[0.0, 1.0, 0.0]));
        index.insert(&unit(&[1.0, 0.0, 0.0]));
        index.insert(&unit(&[0.7, 0.7, 0.0]));

        let result = index.nearest(&unit(&[1.0, 0.0, 0.0]), 3).unwrap();

        let rows: Vec<usize> = result.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![1, 2, 0]);
        assert!((result[0].score - 1.0).abs() < 1e-6);
        for w in result.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }

    #[test]
    fn test_nearest_ties_prefer_lowest_row() {
        let mut index = SimilarityIndex::new();
        index.insert(&unit(&[0.0, 1.0]));
        index.insert(&unit(&[1.0, 0.0]));
        index.insert(&unit(&[1.0, 0.0]));
        index.insert(&unit(&[1.0, 0.0]));

        let result = index.nearest(&[1.0, 0.0], 1).unwrap();
        assert_eq!(result, vec![Neighbor { row: 1, score: 1.0 }]);

        let result = index.nearest(&[1.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = result.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn test_nearest_k_larger_than_rows() {
        let mut index = SimilarityIndex::new();
        index.insert(&unit(&[1.0, 0.0]));
        index.insert(&unit(&[0.0, 1.0]));

        assert_eq!(index.nearest(&[1.0, 0.0], 10).unwrap().len(), 2);
        assert!(index.nearest(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_nearest_huge_k_is_capped() {
        let mut index = SimilarityIndex::new();
        index.insert(&unit(&[1.0, 0.0]));

        let result = index.nearest(&[1.0, 0.0], usize::MAX / 2).unwrap();
        assert_eq!(result, vec![Neighbor { row: 0, score: 1.0 }]);

        let result = index.nearest(&[1.0, 0.0], usize::MAX).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_nearest_matches_exhaustive_scan() {
        // Deterministic pseudo-random rows (LCG), checked against a full sort
        let dim = 16;
        let mut state = 42u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0
        };

        let mut index = SimilarityIndex::new();
        let mut rows = Vec::new();
        for _ in 0..200 {
            let v = unit(&(0..dim).map(|_| next()).collect::<Vec<_>>());
            index.insert(&v);
            rows.push(v);
        }
        let query = unit(&(0..dim).map(|_| next()).collect::<Vec<_>>());

        let mut expected: Vec<(usize, f32)> = rows
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot_product(v, &query).unwrap()))
            .collect();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let result = index.nearest(&query, 5).unwrap();
        let got: Vec<usize> = result.iter().map(|n| n.row).collect();
        let want: Vec<usize> = expected.iter().take(5).map(|(i, _)| *i).collect();
        assert_eq!(got, want);
    }
}
