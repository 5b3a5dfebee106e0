//! Feature normalization applied once before initialization.
//!
//! Both transforms are stateless and mutate the data store's feature
//! matrices in place. Min-max derives its affine map from train-set extrema
//! only and applies the same map to the test set; L2 rescales each sample
//! column independently.

use crate::primitives::Matrix;

/// Rescales each feature row of `train` into [0, 1] using train extrema,
/// then applies the identical affine map to `test`.
///
/// Constant feature rows are mapped to 0. Test entries may land outside
/// [0, 1]; the map is never re-derived from test statistics.
pub fn min_max_normalize(train: &mut Matrix<f32>, test: &mut Matrix<f32>) {
    let n_features = train.n_rows();
    for row in 0..n_features {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for col in 0..train.n_cols() {
            let v = train.get(row, col);
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        let range = hi - lo;
        let scale = if range.abs() > 1e-10 { 1.0 / range } else { 0.0 };
        for col in 0..train.n_cols() {
            let v = train.get(row, col);
            train.set(row, col, (v - lo) * scale);
        }
        if row < test.n_rows() {
            for col in 0..test.n_cols() {
                let v = test.get(row, col);
                test.set(row, col, (v - lo) * scale);
            }
        }
    }
}

/// Rescales every column of `x` to unit Euclidean norm.
///
/// Zero columns are left untouched.
pub fn l2_normalize(x: &mut Matrix<f32>) {
    for col in 0..x.n_cols() {
        let mut norm_sq = 0.0;
        for row in 0..x.n_rows() {
            let v = x.get(row, col);
            norm_sq += v * v;
        }
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            x.scale_column(col, inv);
        }
    }
}
