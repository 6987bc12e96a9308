//! Infinite power of a row-stochastic matrix
//!
//! With `M = Q·Λ·Q⁻¹`, `M^∞ = Q·Λ^∞·Q⁻¹` where every eigenvalue is truncated to
//! its asymptotic value: 1 when `trunc(re + tolerance) >= 1`, 0 otherwise. Only
//! the unit eigenvalues survive, so the limit is the spectral projector onto
//! the unit eigenspace: `R·(Lᵀ·R)⁻¹·Lᵀ`, with `R` the right and `L` the left
//! eigenvectors of eigenvalue 1 (the null spaces of `M - I`, taken from its
//! SVD). A singular `Lᵀ·R`, as produced by a defective unit eigenvalue, falls
//! back to the pseudo-inverse.

use nalgebra::DMatrix;
use tracing::warn;

/// Threshold, relative to the largest singular value, below which the
/// eigenvector basis is treated as singular
const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Result of raising a matrix to an infinite power
#[derive(Debug, Clone)]
pub struct MatrixLimit {
    pub matrix: DMatrix<f64>,
    /// The eigenvector basis was singular and the pseudo-inverse was used
    pub used_pseudo_inverse: bool,
}

/// Divide every row by its sum; zero rows stay zero
pub fn normalize_rows(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let mut normalized = matrix.clone();
    for i in 0..normalized.nrows() {
        let sum: f64 = normalized.row(i).iter().sum();
        if sum == 0.0 {
            continue;
        }
        for j in 0..normalized.ncols() {
            normalized[(i, j)] /= sum;
        }
    }
    normalized
}

/// Count the eigenvalues that truncate to 1 at infinity
fn unit_eigenvalue_count(matrix: &DMatrix<f64>, tolerance: f64) -> usize {
    matrix
        .complex_eigenvalues()
        .iter()
        .filter(|lambda| (lambda.re + tolerance).trunc() >= 1.0)
        .count()
}

/// Raise a row-normalized square matrix to an infinite power
pub fn power_to_infinity(matrix: &DMatrix<f64>, tolerance: f64) -> MatrixLimit {
    let n = matrix.nrows();
    let zero = || MatrixLimit {
        matrix: DMatrix::zeros(n, n),
        used_pseudo_inverse: false,
    };

    let unit = unit_eigenvalue_count(matrix, tolerance);
    if unit == 0 {
        return zero();
    }

    let shifted = matrix - DMatrix::<f64>::identity(n, n);
    let svd = shifted.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        warn!("SVD did not produce singular vectors, treating limit as zero");
        return zero();
    };

    // Smallest singular values span the null spaces of M - I
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));
    let picked = &order[..unit.min(n)];
    let k = picked.len();

    let right = DMatrix::from_fn(n, k, |row, col| v_t[(picked[col], row)]);
    let left = DMatrix::from_fn(n, k, |row, col| u[(row, picked[col])]);
    let gram = left.transpose() * &right;

    let (inverse, used_pseudo_inverse) = match invert_basis(&gram) {
        Some(inverse) => (inverse, false),
        None => {
            warn!(
                unit_eigenvalues = k,
                "Singular matrix error, falling back to pseudo-inverse. Check for rows or columns fully filled with zeros"
            );
            let pseudo = gram
                .clone()
                .pseudo_inverse(SINGULARITY_THRESHOLD)
                .unwrap_or_else(|_| DMatrix::zeros(k, k));
            (pseudo, true)
        }
    };

    MatrixLimit {
        matrix: &right * inverse * left.transpose(),
        used_pseudo_inverse,
    }
}

fn invert_basis(gram: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let singular = gram.singular_values();
    let largest = singular.max();
    if largest == 0.0 || singular.min() / largest < SINGULARITY_THRESHOLD {
        return None;
    }
    gram.clone().try_inverse()
}

/// Probability of being absorbed in the last state when starting in the first
///
/// `matrix` holds raw transition weights; rows are normalized first.
pub fn absorption_probability(matrix: &DMatrix<f64>, tolerance: f64) -> (f64, bool) {
    let n = matrix.nrows();
    if n == 0 {
        return (0.0, false);
    }
    let limit = power_to_infinity(&normalize_rows(matrix), tolerance);
    (
        limit.matrix[(0, n - 1)].clamp(0.0, 1.0),
        limit.used_pseudo_inverse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rows_zero_row_stays_zero() {
        let matrix = DMatrix::from_row_slice(2, 2, &[2.0, 2.0, 0.0, 0.0]);
        let normalized = normalize_rows(&matrix);
        assert_eq!(normalized, DMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.0, 0.0]));
    }

    #[test]
    fn test_identity_limit_is_identity() {
        let identity = DMatrix::<f64>::identity(3, 3);
        let limit = power_to_infinity(&identity, 0.001);
        assert!((limit.matrix - identity).abs().max() < 1e-9);
        assert!(!limit.used_pseudo_inverse);
    }

    #[test]
    fn test_two_absorbing_states_split() {
        // start -> a (0.5) / b (0.5); a and b absorbing
        let matrix = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 0.5, 0.5, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
        );
        let limit = power_to_infinity(&matrix, 0.001);
        assert!((limit.matrix[(0, 1)] - 0.5).abs() < 1e-9);
        assert!((limit.matrix[(0, 2)] - 0.5).abs() < 1e-9);
        assert!(limit.matrix[(0, 0)].abs() < 1e-9);
    }

    #[test]
    fn test_chain_with_loop_converges() {
        // start -> x; x -> x (0.5), null (0.25), conversion (0.25)
        let matrix = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.5, 0.25, 0.25, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        );
        let (probability, _) = absorption_probability(&matrix, 0.001);
        assert!((probability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_absorption_of_raw_counts() {
        let matrix = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 3.0, 1.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
        );
        let (probability, _) = absorption_probability(&matrix, 0.001);
        assert!((probability - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_invert_basis_rejects_singular_gram() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        assert!(invert_basis(&singular).is_none());

        let regular = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let inverse = invert_basis(&regular).unwrap();
        assert!((inverse - DMatrix::from_row_slice(2, 2, &[0.5, 0.0, 0.0, 0.25])).abs().max() < 1e-12);
    }

    #[test]
    fn test_defective_unit_eigenvalue_falls_back_to_pseudo_inverse() {
        // Eigenvalue 1 appears twice but has a single eigenvector, so the
        // left and right bases picked from M - I are orthogonal
        let matrix = DMatrix::from_row_slice(
            3,
            3,
            &[
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 0.5,
            ],
        );
        let limit = power_to_infinity(&matrix, 0.001);

        assert!(limit.used_pseudo_inverse);
        assert!(limit.matrix.iter().all(|v| v.is_finite()));
        let mut expected = DMatrix::<f64>::zeros(3, 3);
        expected[(2, 2)] = 1.0;
        assert!((limit.matrix - expected).abs().max() < 1e-9);
    }

    #[test]
    fn test_no_unit_eigenvalue_limit_is_zero() {
        let matrix = DMatrix::from_row_slice(2, 2, &[0.0, 0.5, 0.0, 0.0]);
        let limit = power_to_infinity(&matrix, 0.001);
        assert_eq!(limit.matrix, DMatrix::<f64>::zeros(2, 2));
    }
}
