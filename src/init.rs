//! Model initialization strategies and the median-heuristic bandwidth
//! estimator.
//!
//! All randomized draws (Gaussian projection, prototype seeding, k-means++
//! seeding, subsampling) come from the single seeded generator owned by the
//! training session, so a fixed seed reproduces the whole initialization.

use crate::cluster;
use crate::data::Dataset;
use crate::error::{PrototipoError, Result};
use crate::hyper::{HyperParams, InitializationType};
use crate::io;
use crate::model::ModelParams;
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::Rng;
use std::path::Path;

/// Gaussian-kernel scale = gamma_numerator * 2.5 / median pairwise distance.
const MEDIAN_MULTIPLIER: f32 = 2.5;
/// Above this many prototype-sample distance products, subsample first.
const MEDIAN_PRODUCT_CAP: u64 = 2_000_000_000;
/// Columns kept when the median heuristic subsamples.
const MEDIAN_SUBSAMPLE: usize = 10_000;
/// Columns kept when overall k-means subsamples.
const OVERALL_KMEANS_SUBSAMPLE: usize = 100_000;

/// Builds initial W, B, Z and gamma for every strategy except
/// [`InitializationType::Predefined`].
///
/// W is drawn i.i.d. standard normal; B and Z come from the configured
/// strategy; gamma is then always recomputed by the median heuristic,
/// overriding any previously configured value. Per-class k-means may change
/// the effective prototype count, which is frozen back into
/// `hyper.n_prototypes` before returning.
///
/// # Errors
///
/// Returns an error for the Predefined strategy (use
/// [`initialize_predefined`]), or when clustering/bandwidth estimation fails.
pub fn initialize(
    hyper: &mut HyperParams,
    data: &Dataset,
    rng: &mut StdRng,
) -> Result<ModelParams> {
    if hyper.initialization == InitializationType::Predefined {
        return Err(
            "predefined initialization loads from files; call initialize_predefined".into(),
        );
    }

    tracing::info!(
        strategy = hyper.initialization.as_str(),
        "initializing projection matrix as a random Gaussian matrix (mean 0, variance 1); \
         this may not work well if the data is not normalized"
    );
    let w = gaussian_matrix(hyper.projection_dim, hyper.input_dim, rng);

    let x_train = data.x_train();
    let y_train = data.y_train();
    let n = x_train.n_cols();

    let (b, z) = match hyper.initialization {
        InitializationType::Sample => {
            let mut b = Matrix::zeros(hyper.projection_dim, hyper.n_prototypes);
            let mut z = Matrix::zeros(hyper.n_labels, hyper.n_prototypes);
            for proto in 0..hyper.n_prototypes {
                let pick = rng.gen_range(0..n);
                let projected = project_column(&w, x_train, pick);
                b.set_column(proto, &projected);
                z.set_column(proto, y_train.column(pick).as_slice());
            }
            (b, z)
        }
        InitializationType::PerClassKmeans => {
            tracing::info!(
                "initializing prototypes by clustering projected data within each class \
                 using k-means++"
            );
            let projected = w.matmul(x_train).map_err(PrototipoError::from)?;
            let per_class = hyper.n_prototypes / hyper.n_labels;
            cluster::kmeans_labelwise(y_train, &projected, per_class, rng)?
        }
        InitializationType::OverallKmeans => {
            tracing::info!(
                "initializing prototypes by clustering all projected data using k-means++"
            );
            let projected = w.matmul(x_train).map_err(PrototipoError::from)?;
            if n > OVERALL_KMEANS_SUBSAMPLE {
                let picks = rand_pick(n, OVERALL_KMEANS_SUBSAMPLE, rng);
                let projected_sub = projected.columns(&picks);
                let y_sub = y_train.columns(&picks);
                cluster::kmeans_overall(&y_sub, &projected_sub, hyper.n_prototypes, rng)?
            } else {
                cluster::kmeans_overall(y_train, &projected, hyper.n_prototypes, rng)?
            }
        }
        InitializationType::Predefined => unreachable!("rejected above"),
    };

    // Freeze the effective prototype count before the training loop reads it.
    hyper.n_prototypes = b.n_cols();

    let gamma = estimate_gamma(hyper, &w, &b, x_train, rng)?;
    hyper.gamma = gamma;
    tracing::info!(gamma, "set kernel bandwidth using median heuristic");

    ModelParams::new(w, b, z, gamma)
}

/// Loads W, Z, B and gamma from header-free TSV files in `model_dir`.
///
/// Files are stored transposed relative to the in-memory orientation (W as
/// D x d, Z as m x l, B as m x d) and are transposed on load. Dimensions are
/// checked against the declared hyperparameters; gamma is written back into
/// `hyper.gamma` and is NOT recomputed.
///
/// # Errors
///
/// Returns an I/O error for missing files, a format error for malformed
/// grids, a dimension mismatch for wrong shapes, or an invalid
/// hyperparameter error when the loaded gamma is not strictly positive.
pub fn initialize_predefined(hyper: &mut HyperParams, model_dir: &Path) -> Result<ModelParams> {
    tracing::info!(dir = %model_dir.display(), "loading predefined model files");

    let w = load_transposed(
        &model_dir.join("W"),
        hyper.input_dim,
        hyper.projection_dim,
    )?;
    let z = load_transposed(&model_dir.join("Z"), hyper.n_prototypes, hyper.n_labels)?;
    let b = load_transposed(
        &model_dir.join("B"),
        hyper.n_prototypes,
        hyper.projection_dim,
    )?;

    let gamma_mat = io::read_tsv_matrix(&model_dir.join("gamma"))?;
    if gamma_mat.shape() != (1, 1) {
        return Err(PrototipoError::FormatError {
            message: format!(
                "gamma file must be a single value, found {:?}",
                gamma_mat.shape()
            ),
        });
    }
    let gamma = gamma_mat.get(0, 0);
    if gamma <= 0.0 {
        return Err(PrototipoError::invalid_hyperparameter("gamma", gamma, ">0"));
    }
    hyper.gamma = gamma;
    tracing::info!(gamma, "gamma loaded from predefined model");

    ModelParams::new(w, b, z, gamma)
}

/// Median-heuristic bandwidth: `multiplier / median(||b_j - p_i||)` over all
/// prototype columns of `b` and point columns of `projected`.
///
/// # Errors
///
/// Returns an error when either matrix has no columns or the median distance
/// is not strictly positive (degenerate prototypes).
pub fn median_heuristic(b: &Matrix<f32>, projected: &Matrix<f32>, multiplier: f32) -> Result<f32> {
    let m = b.n_cols();
    let n = projected.n_cols();
    if m == 0 || n == 0 {
        return Err("median heuristic needs at least one prototype and one point".into());
    }

    let dim = b.n_rows();
    let mut dists = Vec::with_capacity(m * n);
    for j in 0..m {
        for i in 0..n {
            let mut d = 0.0f32;
            for row in 0..dim {
                let diff = b.get(row, j) - projected.get(row, i);
                d += diff * diff;
            }
            dists.push(d.sqrt());
        }
    }

    let mid = dists.len() / 2;
    let (_, median, _) = dists.select_nth_unstable_by(mid, f32::total_cmp);
    let median = *median;
    if median <= 0.0 {
        return Err(PrototipoError::Other(format!(
            "median pairwise distance is {median}; prototypes are degenerate"
        )));
    }
    Ok(multiplier / median)
}

fn estimate_gamma(
    hyper: &HyperParams,
    w: &Matrix<f32>,
    b: &Matrix<f32>,
    x_train: &Matrix<f32>,
    rng: &mut StdRng,
) -> Result<f32> {
    let multiplier = hyper.gamma_numerator * MEDIAN_MULTIPLIER;
    let n = x_train.n_cols() as u64;
    let m = b.n_cols() as u64;

    let projected = w.matmul(x_train).map_err(PrototipoError::from)?;
    if n * m > MEDIAN_PRODUCT_CAP {
        let picks = rand_pick(x_train.n_cols(), MEDIAN_SUBSAMPLE, rng);
        let sub = projected.columns(&picks);
        median_heuristic(b, &sub, multiplier)
    } else {
        median_heuristic(b, &projected, multiplier)
    }
}

/// Standard-normal matrix via the Box-Muller transform over the seeded rng.
fn gaussian_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Matrix<f32> {
    let data: Vec<f32> = (0..rows * cols)
        .map(|_| {
            let u1: f32 = rng.gen_range(0.0001_f32..1.0_f32);
            let u2: f32 = rng.gen_range(0.0_f32..1.0_f32);
            (-2.0_f32 * u1.ln()).sqrt() * (2.0_f32 * std::f32::consts::PI * u2).cos()
        })
        .collect();
    Matrix::from_vec(rows, cols, data).expect("sized by construction")
}

/// W * x_train[:, col] without materializing the full projection.
fn project_column(w: &Matrix<f32>, x: &Matrix<f32>, col: usize) -> Vec<f32> {
    let d = w.n_rows();
    let dim = w.n_cols();
    let mut out = vec![0.0f32; d];
    for (row, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for k in 0..dim {
            acc += w.get(row, k) * x.get(k, col);
        }
        *slot = acc;
    }
    out
}

/// Picks `count` distinct column indices uniformly (partial Fisher-Yates).
fn rand_pick(n: usize, count: usize, rng: &mut StdRng) -> Vec<usize> {
    let count = count.min(n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..count {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(count);
    indices
}

fn load_transposed(path: &Path, file_rows: usize, file_cols: usize) -> Result<Matrix<f32>> {
    let loaded = io::read_tsv_matrix(path)?;
    if loaded.shape() != (file_rows, file_cols) {
        return Err(PrototipoError::DimensionMismatch {
            expected: format!("{file_rows}x{file_cols} in {}", path.display()),
            actual: format!("{}x{}", loaded.n_rows(), loaded.n_cols()),
        });
    }
    Ok(loaded.transpose())
}
