//! This is the vector math module
//! Provide L2 normalization and dot product over face embeddings

use crate::error::{MatchError, Result};

/// Euclidean length of a vector
pub fn norm(vector: &[f32]) -> f32 {
    vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt()
}

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// Empty, zero and non-finite vectors cannot be normalized
pub fn l2_norm(vector: &[f32]) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(MatchError::DegenerateVector { reason: "empty vector" });
    }

    let norm = norm(vector);

    if !norm.is_finite() {
        return Err(MatchError::DegenerateVector { reason: "non-finite norm" });
    }
    if norm == 0.0 {
        return Err(MatchError::DegenerateVector { reason: "zero norm" });
    }

    let normed_vec = vector.iter()
        .map(|x| x / norm)
        .collect();

    Ok(normed_vec)
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) for i = 0..a.len()
/// For unit vectors this is the cosine similarity, in [-1, 1]
pub fn dot_product(left: &[f32], right: &[f32]) -> Result<f32> {
    if left.len() != right.len() {
        return Err(MatchError::DimensionMismatch {
            expected: left.len(),
            actual: right.len(),
        });
    }

    let dot_prod = left.iter()
        .zip(right.iter())
        .map(|(x, y)| x * y)
        .sum();

    Ok(dot_prod)
}

#[cfg(test)]
mod vector_test {
    use super::*;

    // ========== L2 Normalization Tests ==========

    #[test]
    fn test_l2_norm_basic() {
        // ||[3,4]|| = 5, so [3,4] -> [0.6, 0.8]
        let result = l2_norm(&[3.0, 4.0]).unwrap();

        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.6).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_is_unit_length() {
        let result = l2_norm(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((norm(&result) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_negative_values() {
        let result = l2_norm(&[-3.0, 4.0]).unwrap();

        assert!((result[0] - (-0.6)).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_zero_vector_error() {
        let result = l2_norm(&[0.0, 0.0, 0.0]);
        assert_eq!(result.unwrap_err(), MatchError::DegenerateVector { reason: "zero norm" });
    }

    #[test]
    fn test_l2_norm_empty_vector() {
        let result = l2_norm(&[]);
        assert_eq!(result.unwrap_err(), MatchError::DegenerateVector { reason: "empty vector" });
    }

    #[test]
    fn test_l2_norm_nan_rejected() {
        let result = l2_norm(&[1.0, f32::NAN, 0.0]);
        assert_eq!(result.unwrap_err(), MatchError::DegenerateVector { reason: "non-finite norm" });
    }

    #[test]
    fn test_l2_norm_infinity_rejected() {
        // Squares overflow to inf even though every component is finite
        let result = l2_norm(&[f32::MAX, f32::MAX]);
        assert!(matches!(result, Err(MatchError::DegenerateVector { .. })));

        let result = l2_norm(&[f32::INFINITY, 1.0]);
        assert!(matches!(result, Err(MatchError::DegenerateVector { .. })));
    }

    // ========== Dot Product Tests ==========

    #[test]
    fn test_dot_product_basic() {
        // 1*4 + 2*5 + 3*6 = 32
        let result = dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!((result - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_orthogonal() {
        let result = dot_product(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(result.abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_dimension_mismatch() {
        let result = dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0]);
        assert_eq!(result.unwrap_err(), MatchError::DimensionMismatch { expected: 3, actual: 2 });
    }

    // ========== Integration Test ==========

    #[test]
    fn test_normalize_then_dot_product() {
        let n1 = l2_norm(&[1.0, 0.0, 0.0]).unwrap();
        let n2 = l2_norm(&[0.9, 0.1, 0.0]).unwrap();

        // 0.9 / sqrt(0.82)
        let similarity = dot_product(&n1, &n2).unwrap();
        assert!((similarity - 0.99388).abs() < 1e-4);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let n = l2_norm(&[0.3, -1.7, 2.2, 5.0]).unwrap();
        let similarity = dot_product(&n, &n).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }
}
