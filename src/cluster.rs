//! Seeded k-means++ clustering over projected training data.
//!
//! Points are matrix columns (the crate-wide columns-as-samples convention).
//! Used by the initializer in two flavors: label-wise (cluster each class's
//! points separately) and overall (cluster everything, derive soft labels
//! from cluster membership).

use crate::error::{PrototipoError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::Rng;

const MAX_ITER: usize = 100;
const TOL: f32 = 1e-4;

/// Runs k-means++ over the columns of `points` (dim x n).
///
/// Returns the centroids as a dim x k matrix plus the per-point cluster
/// assignment. Seeding uses the classic D^2-weighted draw from `rng`, so a
/// fixed seed gives a fixed clustering.
///
/// # Errors
///
/// Returns an error if `k` is zero or exceeds the number of points.
pub fn kmeans_pp(
    points: &Matrix<f32>,
    k: usize,
    rng: &mut StdRng,
) -> Result<(Matrix<f32>, Vec<usize>)> {
    let (dim, n) = points.shape();
    if k == 0 {
        return Err(PrototipoError::invalid_hyperparameter("k", k, ">0"));
    }
    if k > n {
        return Err(PrototipoError::invalid_hyperparameter(
            "k",
            k,
            "<= number of points",
        ));
    }

    let mut centroids = seed_centroids(points, k, rng);
    let mut assignments = vec![0usize; n];

    for _ in 0..MAX_ITER {
        for (i, slot) in assignments.iter_mut().enumerate() {
            *slot = nearest_centroid(points, i, &centroids);
        }

        let mut sums = Matrix::zeros(dim, k);
        let mut counts = vec![0usize; k];
        for (i, &c) in assignments.iter().enumerate() {
            counts[c] += 1;
            for row in 0..dim {
                let v = sums.get(row, c) + points.get(row, i);
                sums.set(row, c, v);
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                // Reseed an empty cluster onto a random point.
                let pick = rng.gen_range(0..n);
                for row in 0..dim {
                    sums.set(row, c, points.get(row, pick));
                }
            } else {
                let inv = 1.0 / counts[c] as f32;
                sums.scale_column(c, inv);
            }
        }

        let mut shift = 0.0f32;
        for c in 0..k {
            for row in 0..dim {
                let d = sums.get(row, c) - centroids.get(row, c);
                shift += d * d;
            }
        }
        centroids = sums;
        if shift.sqrt() <= TOL {
            break;
        }
    }

    for (i, slot) in assignments.iter_mut().enumerate() {
        *slot = nearest_centroid(points, i, &centroids);
    }
    Ok((centroids, assignments))
}

/// Clusters each class's projected points separately, `per_class` clusters
/// per class.
///
/// Returns (B, Z) where B collects all centroids (dim x m_eff) and Z holds
/// the originating class's indicator per centroid (l x m_eff). A class with
/// fewer points than `per_class` contributes one centroid per point, so the
/// effective prototype count may differ from `per_class * l`.
///
/// # Errors
///
/// Returns an error if some class has no training points.
pub fn kmeans_labelwise(
    y: &Matrix<f32>,
    projected: &Matrix<f32>,
    per_class: usize,
    rng: &mut StdRng,
) -> Result<(Matrix<f32>, Matrix<f32>)> {
    let n_labels = y.n_rows();
    let dim = projected.n_rows();

    let mut all_centroids: Vec<Matrix<f32>> = Vec::with_capacity(n_labels);
    let mut class_counts: Vec<usize> = Vec::with_capacity(n_labels);
    for class in 0..n_labels {
        let members: Vec<usize> = (0..y.n_cols())
            .filter(|&i| y.get(class, i) > 0.0)
            .collect();
        if members.is_empty() {
            return Err(PrototipoError::Other(format!(
                "class {class} has no training points for per-class k-means"
            )));
        }
        let k = per_class.min(members.len());
        let subset = projected.columns(&members);
        let (centroids, _) = kmeans_pp(&subset, k, rng)?;
        class_counts.push(centroids.n_cols());
        all_centroids.push(centroids);
    }

    let m_eff: usize = class_counts.iter().sum();
    let mut b = Matrix::zeros(dim, m_eff);
    let mut z = Matrix::zeros(n_labels, m_eff);
    let mut col = 0;
    for (class, centroids) in all_centroids.iter().enumerate() {
        for c in 0..centroids.n_cols() {
            for row in 0..dim {
                b.set(row, col, centroids.get(row, c));
            }
            z.set(class, col, 1.0);
            col += 1;
        }
    }
    Ok((b, z))
}

/// Clusters all projected points together and derives each centroid's label
/// vector as the mean of its members' label columns.
///
/// # Errors
///
/// Returns an error if `m` exceeds the number of points.
pub fn kmeans_overall(
    y: &Matrix<f32>,
    projected: &Matrix<f32>,
    m: usize,
    rng: &mut StdRng,
) -> Result<(Matrix<f32>, Matrix<f32>)> {
    let (centroids, assignments) = kmeans_pp(projected, m, rng)?;
    let n_labels = y.n_rows();

    let mut z = Matrix::zeros(n_labels, m);
    let mut counts = vec![0usize; m];
    for (i, &c) in assignments.iter().enumerate() {
        counts[c] += 1;
        for row in 0..n_labels {
            let v = z.get(row, c) + y.get(row, i);
            z.set(row, c, v);
        }
    }
    for c in 0..m {
        if counts[c] > 0 {
            z.scale_column(c, 1.0 / counts[c] as f32);
        }
    }
    Ok((centroids, z))
}

fn seed_centroids(points: &Matrix<f32>, k: usize, rng: &mut StdRng) -> Matrix<f32> {
    let (dim, n) = points.shape();
    let mut centroids = Matrix::zeros(dim, k);
    let mut chosen: Vec<usize> = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    chosen.push(first);
    for row in 0..dim {
        centroids.set(row, 0, points.get(row, first));
    }

    let mut min_dist = vec![f32::INFINITY; n];
    for c in 1..k {
        let last = chosen[c - 1];
        for (i, slot) in min_dist.iter_mut().enumerate() {
            let mut d = 0.0;
            for row in 0..dim {
                let diff = points.get(row, i) - points.get(row, last);
                d += diff * diff;
            }
            if d < *slot {
                *slot = d;
            }
        }

        let total: f32 = min_dist.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen::<f32>() * total;
            let mut idx = n - 1;
            for (i, &d) in min_dist.iter().enumerate() {
                if target <= d {
                    idx = i;
                    break;
                }
                target -= d;
            }
            idx
        } else {
            // All points coincide with an existing centroid.
            rng.gen_range(0..n)
        };

        chosen.push(pick);
        for row in 0..dim {
            centroids.set(row, c, points.get(row, pick));
        }
    }
    centroids
}

fn nearest_centroid(points: &Matrix<f32>, i: usize, centroids: &Matrix<f32>) -> usize {
    let dim = points.n_rows();
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for c in 0..centroids.n_cols() {
        let mut d = 0.0;
        for row in 0..dim {
            let diff = points.get(row, i) - centroids.get(row, c);
            d += diff * diff;
        }
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn two_blob_points() -> Matrix<f32> {
        // Columns are points: three near the origin, three near (10, 10).
        Matrix::from_vec(
            2,
            6,
            vec![
                0.0, 0.2, 0.1, 10.0, 10.1, 9.9, //
                0.1, 0.0, 0.2, 10.0, 9.9, 10.2,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_kmeans_pp_separates_blobs() {
        let points = two_blob_points();
        let mut rng = StdRng::seed_from_u64(7);
        let (centroids, labels) = kmeans_pp(&points, 2, &mut rng).unwrap();

        assert_eq!(centroids.shape(), (2, 2));
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_pp_deterministic_for_fixed_seed() {
        let points = two_blob_points();
        let (c1, l1) = kmeans_pp(&points, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        let (c2, l2) = kmeans_pp(&points, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(l1, l2);
    }

    #[test]
    fn test_kmeans_pp_rejects_k_over_n() {
        let points = two_blob_points();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(kmeans_pp(&points, 7, &mut rng).is_err());
        assert!(kmeans_pp(&points, 0, &mut rng).is_err());
    }

    #[test]
    fn test_labelwise_shapes_and_indicators() {
        let points = two_blob_points();
        // First three points class 0, last three class 1.
        let y = Matrix::from_vec(
            2,
            6,
            vec![
                1.0, 1.0, 1.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let (b, z) = kmeans_labelwise(&y, &points, 2, &mut rng).unwrap();

        assert_eq!(b.shape(), (2, 4));
        assert_eq!(z.shape(), (2, 4));
        // Each Z column is an exact class indicator.
        for col in 0..4 {
            let sum: f32 = (0..2).map(|r| z.get(r, col)).sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        // Columns are grouped by class: first two belong to class 0.
        assert!((z.get(0, 0) - 1.0).abs() < 1e-6);
        assert!((z.get(1, 3) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_labelwise_empty_class_is_error() {
        let points = two_blob_points();
        let y = Matrix::zeros(2, 6); // no memberships at all
        let mut rng = StdRng::seed_from_u64(0);
        assert!(kmeans_labelwise(&y, &points, 1, &mut rng).is_err());
    }

    #[test]
    fn test_overall_soft_labels_are_means() {
        let points = two_blob_points();
        let y = Matrix::from_vec(
            2,
            6,
            vec![
                1.0, 1.0, 0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
            ],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let (b, z) = kmeans_overall(&y, &points, 2, &mut rng).unwrap();

        assert_eq!(b.shape(), (2, 2));
        assert_eq!(z.shape(), (2, 2));
        // Label columns are convex combinations of one-hot labels.
        for col in 0..2 {
            let sum: f32 = (0..2).map(|r| z.get(r, col)).sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }
}
