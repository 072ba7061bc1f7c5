//! Vector primitives: distance metrics and running sample statistics
//!
//! Everything here operates on `&[f64]`. Callers are responsible for
//! ensuring vectors being compared share the same dimension; the functions
//! in this module panic on length mismatch rather than silently truncating,
//! since a mismatch always indicates a caller bug.

/// Squared Euclidean distance between two vectors.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two vectors.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` (rather than `NaN`) when either vector is the zero vector,
/// matching `numpy.nan_to_num(..., 0)` in the source this was distilled
/// from.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector length mismatch");
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_nan() {
        0.0
    } else {
        sim.clamp(-1.0, 1.0)
    }
}

/// Elementwise mean of a non-empty slice of equal-length vectors.
pub fn mean(vectors: &[Vec<f64>]) -> Vec<f64> {
    assert!(!vectors.is_empty(), "mean of empty vector set");
    let dims = vectors[0].len();
    let mut acc = vec![0.0; dims];
    for v in vectors {
        for (a, x) in acc.iter_mut().zip(v) {
            *a += x;
        }
    }
    let n = vectors.len() as f64;
    for a in acc.iter_mut() {
        *a /= n;
    }
    acc
}

/// Sample covariance matrix (`D x D`, row-major) of a set of observations,
/// following `numpy.cov`'s convention of dividing by `N - 1`. A single
/// observation yields a zero matrix (population of size 1 has no sample
/// variance).
pub fn sample_covariance(observations: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = observations[0].len();
    let mu = mean(observations);
    let n = observations.len();
    let mut cov = vec![vec![0.0; dims]; dims];
    if n < 2 {
        return cov;
    }
    for obs in observations {
        for i in 0..dims {
            for j in 0..dims {
                cov[i][j] += (obs[i] - mu[i]) * (obs[j] - mu[j]);
            }
        }
    }
    let denom = (n - 1) as f64;
    for row in cov.iter_mut() {
        for v in row.iter_mut() {
            *v /= denom;
        }
    }
    cov
}

/// L2 norm of the per-dimension sample standard deviation vector.
///
/// This is `CovarianceCluster.std`: not the norm of the covariance matrix,
/// but the norm of the vector of per-dimension standard deviations
/// (`numpy.std(instances, axis=0)` in the source).
pub fn std_norm(observations: &[Vec<f64>]) -> f64 {
    let dims = observations[0].len();
    let mu = mean(observations);
    let n = observations.len() as f64;
    let mut sum_sq = 0.0;
    for d in 0..dims {
        let variance: f64 = observations
            .iter()
            .map(|o| (o[d] - mu[d]) * (o[d] - mu[d]))
            .sum::<f64>()
            / n;
        sum_sq += variance;
    }
    sum_sq.sqrt()
}

/// Solve `Σ x = b` via Gauss-Jordan elimination, used by Mahalanobis
/// distance. Returns `None` if `Σ` is singular to working precision.
fn solve(matrix: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = matrix.len();
    let mut a: Vec<Vec<f64>> = matrix.iter().map(|row| row.clone()).collect();
    let mut x = b.to_vec();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap()
        })?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        x.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
        }
        x[col] /= pivot;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
            }
            x[row] -= factor * x[col];
        }
    }

    Some(x)
}

/// Mahalanobis distance `sqrt((x - mu)^T Sigma^-1 (x - mu))`.
///
/// Falls back to Euclidean distance against `mu` if `Sigma` is singular
/// (e.g. a freshly seeded cluster whose covariance is the identity is
/// always invertible, but degenerate observation sets are not).
pub fn mahalanobis(x: &[f64], mu: &[f64], covariance: &[Vec<f64>]) -> f64 {
    let diff: Vec<f64> = x.iter().zip(mu).map(|(a, b)| a - b).collect();
    match solve(covariance, &diff) {
        Some(solved) => {
            let quad: f64 = diff.iter().zip(&solved).map(|(d, s)| d * s).sum();
            quad.max(0.0).sqrt()
        }
        None => euclidean(x, mu),
    }
}

/// `D x D` identity matrix.
pub fn identity(dims: usize) -> Vec<Vec<f64>> {
    let mut m = vec![vec![0.0; dims]; dims];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_correct() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 1e-9);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero_not_nan() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn euclidean_matches_known_triangle() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean(&a, &b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn mean_of_single_vector_is_itself() {
        let v = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(mean(&v), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_observation_has_zero_covariance() {
        let obs = vec![vec![1.0, 2.0]];
        let cov = sample_covariance(&obs);
        assert_eq!(cov, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn mahalanobis_with_identity_covariance_is_euclidean() {
        let x = vec![1.0, 0.0];
        let mu = vec![0.0, 0.0];
        let cov = identity(2);
        assert!((mahalanobis(&x, &mu, &cov) - 1.0).abs() < 1e-9);

        let x2 = vec![1.0, 1.0];
        assert!((mahalanobis(&x2, &mu, &cov) - 2.0_f64.sqrt()).abs() < 1e-9);
    }
}
