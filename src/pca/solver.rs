//! Principal-component solver
//!
//! A small dense PCA over an observations x variables matrix, computed by
//! eigendecomposition of the observation Gram matrix (power iteration with
//! deflation). Observation counts are small for bulk RNA-seq, so the Gram
//! matrix stays tiny even when thousands of variables are selected.
//! R equivalent: prcomp(x, center=..., scale.=...)

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{BulkError, Result};

const POWER_MAX_ITER: usize = 500;

/// Result of a principal-component decomposition
#[derive(Debug, Clone)]
pub struct PcaSolution {
    /// Observation coordinates (observations x k)
    pub scores: Array2<f64>,
    /// Variable loadings (variables x k)
    pub loadings: Array2<f64>,
    /// Fraction of total variance captured by each component
    pub variance_explained: Array1<f64>,
    /// Whether variables were mean-centered
    pub centered: bool,
    /// Whether variables were scaled to unit variance
    pub scaled: bool,
}

/// Compute principal components of an observations x variables matrix.
///
/// Extracts `k = min(observations, variables)` components. Scaling divides
/// each variable by its sample (n-1) standard deviation about the mean;
/// a variable with zero variance cannot be scaled and is an error.
pub fn principal_components(
    data: ArrayView2<'_, f64>,
    center: bool,
    scale: bool,
) -> Result<PcaSolution> {
    let (n_obs, n_vars) = data.dim();

    if n_obs < 2 {
        return Err(BulkError::InvalidInput {
            reason: format!("PCA requires at least 2 observations, got {}", n_obs),
        });
    }
    if n_vars == 0 {
        return Err(BulkError::InvalidInput {
            reason: "PCA requires at least 1 variable".to_string(),
        });
    }

    // Column-standardize into a working copy
    let mut z = data.to_owned();
    if center {
        for mut col in z.axis_iter_mut(Axis(1)) {
            let m = col.sum() / n_obs as f64;
            col.mapv_inplace(|x| x - m);
        }
    }
    if scale {
        for (j, mut col) in z.axis_iter_mut(Axis(1)).enumerate() {
            let m = col.sum() / n_obs as f64;
            let ss: f64 = col.iter().map(|&x| (x - m) * (x - m)).sum();
            let sd = (ss / (n_obs - 1) as f64).sqrt();
            if sd == 0.0 {
                return Err(BulkError::InvalidInput {
                    reason: format!("variable {} has zero variance and cannot be scaled", j),
                });
            }
            col.mapv_inplace(|x| x / sd);
        }
    }

    // Gram matrix over observations; its nonzero eigenvalues are the squared
    // singular values of z.
    let gram = z.dot(&z.t());
    let total_variance: f64 = gram.diag().sum();

    let k = n_obs.min(n_vars);
    let mut scores = Array2::zeros((n_obs, k));
    let mut loadings = Array2::zeros((n_vars, k));
    let mut variance_explained = Array1::zeros(k);

    let mut deflated = gram;
    for comp in 0..k {
        let (eigenvalue, u) = power_iteration(&deflated, POWER_MAX_ITER);
        let lambda = eigenvalue.max(0.0);
        let sigma = lambda.sqrt();

        // scores = U * Sigma, loadings = Z' U / Sigma
        for i in 0..n_obs {
            scores[[i, comp]] = u[i] * sigma;
        }
        if sigma > 1e-12 {
            let v = z.t().dot(&u);
            for j in 0..n_vars {
                loadings[[j, comp]] = v[j] / sigma;
            }
        }
        if total_variance > 0.0 {
            variance_explained[comp] = lambda / total_variance;
        }

        deflate(&mut deflated, eigenvalue, &u);
    }

    Ok(PcaSolution {
        scores,
        loadings,
        variance_explained,
        centered: center,
        scaled: scale,
    })
}

/// Dominant eigenpair of a symmetric matrix by power iteration
fn power_iteration(matrix: &Array2<f64>, max_iter: usize) -> (f64, Array1<f64>) {
    let n = matrix.nrows();
    let mut v = Array1::from_iter((0..n).map(|i| 1.0 / (i + 1) as f64));
    let norm = v.dot(&v).sqrt();
    v /= norm;

    let mut eigenvalue = 0.0;

    for _ in 0..max_iter {
        let mut new_v = matrix.dot(&v);
        eigenvalue = new_v.dot(&v);
        let norm = new_v.dot(&new_v).sqrt();
        if norm < 1e-15 {
            break;
        }
        new_v /= norm;
        let diff = (&new_v - &v).mapv(|x| x * x).sum();
        v = new_v;
        if diff < 1e-12 {
            break;
        }
    }

    (eigenvalue, v)
}

/// Remove an extracted eigenpair: matrix -= lambda * v v'
fn deflate(matrix: &mut Array2<f64>, eigenvalue: f64, v: &Array1<f64>) {
    let n = matrix.nrows();
    for i in 0..n {
        for j in 0..n {
            matrix[[i, j]] -= eigenvalue * v[i] * v[j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_collinear_points_are_rank_one() {
        // Points on the line y = x/2: one component carries all the variance
        let data = array![[0.0, 0.0], [2.0, 1.0], [4.0, 2.0], [6.0, 3.0]];
        let pca = principal_components(data.view(), true, false).unwrap();

        assert!(pca.variance_explained[0] > 0.999);
        assert!(pca.variance_explained[1] < 1e-6);
        // Second-component scores collapse to zero
        for i in 0..4 {
            assert!(pca.scores[[i, 1]].abs() < 1e-6, "score {}", pca.scores[[i, 1]]);
        }
        // First loading is proportional to (2, 1), up to sign
        let ratio = pca.loadings[[0, 0]] / pca.loadings[[1, 0]];
        assert!((ratio - 2.0).abs() < 1e-6, "ratio {}", ratio);
    }

    #[test]
    fn test_reconstruction_from_scores_and_loadings() {
        let data = array![
            [2.0, 8.0, 1.0],
            [4.0, 6.0, 3.0],
            [6.0, 5.0, 2.0],
            [8.0, 3.0, 5.0],
            [10.0, 2.0, 4.0],
        ];
        let pca = principal_components(data.view(), true, true).unwrap();

        // Standardize the input the same way the solver does
        let n = data.nrows() as f64;
        let mut z = data.clone();
        for j in 0..3 {
            let mean = z.column(j).sum() / n;
            let ss: f64 = z.column(j).iter().map(|&x| (x - mean) * (x - mean)).sum();
            let sd = (ss / (n - 1.0)).sqrt();
            for i in 0..z.nrows() {
                z[[i, j]] = (z[[i, j]] - mean) / sd;
            }
        }

        let reconstructed = pca.scores.dot(&pca.loadings.t());
        for i in 0..z.nrows() {
            for j in 0..z.ncols() {
                assert!(
                    (reconstructed[[i, j]] - z[[i, j]]).abs() < 1e-4,
                    "[{},{}]: {} vs {}",
                    i,
                    j,
                    reconstructed[[i, j]],
                    z[[i, j]]
                );
            }
        }
    }

    #[test]
    fn test_score_columns_are_orthogonal() {
        let data = array![
            [1.0, 7.0, 2.0],
            [3.0, 1.0, 9.0],
            [5.0, 4.0, 4.0],
            [2.0, 8.0, 6.0],
        ];
        let pca = principal_components(data.view(), true, false).unwrap();
        for a in 0..3 {
            for b in (a + 1)..3 {
                let dot = pca.scores.column(a).dot(&pca.scores.column(b));
                assert!(dot.abs() < 1e-4, "columns {} and {}: {}", a, b, dot);
            }
        }
    }

    #[test]
    fn test_variance_fractions_ordered_and_bounded() {
        let data = array![
            [1.0, 2.0, 3.0],
            [4.0, 3.0, 1.0],
            [2.0, 5.0, 2.0],
            [5.0, 1.0, 4.0],
        ];
        let pca = principal_components(data.view(), true, true).unwrap();
        let total: f64 = pca.variance_explained.sum();
        assert!(total <= 1.0 + 1e-9, "total {}", total);
        for w in pca.variance_explained.to_vec().windows(2) {
            assert!(w[0] >= w[1] - 1e-6, "{:?}", pca.variance_explained);
        }
    }

    #[test]
    fn test_flags_echoed() {
        let data = array![[1.0, 2.0], [3.0, 1.0], [2.0, 4.0]];
        let pca = principal_components(data.view(), true, false).unwrap();
        assert!(pca.centered);
        assert!(!pca.scaled);
    }

    #[test]
    fn test_zero_variance_variable_rejected_when_scaling() {
        let data = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let result = principal_components(data.view(), true, true);
        assert!(matches!(result, Err(BulkError::InvalidInput { .. })));
    }

    #[test]
    fn test_single_observation_rejected() {
        let data = array![[1.0, 2.0]];
        assert!(principal_components(data.view(), true, false).is_err());
    }
}
