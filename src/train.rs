//! The alternating-minimization training loop.
//!
//! A [`TrainingSession`] owns the hyperparameters, the model parameters and
//! one seeded random generator. Training cycles through the three update
//! states {W, Z, B} for `iters` outer rounds; each state runs `epochs`
//! shuffled mini-batch passes of a kernel-weighted squared-loss gradient
//! step followed by a hard sparsity projection. Objective and accuracy are
//! recorded after every sub-step but never influence control flow.
//!
//! Non-finite values arising from degenerate bandwidths or over-aggressive
//! sparsity are not detected here; they surface through the recorded
//! statistics and the final parameters.

use crate::data::Dataset;
use crate::error::Result;
use crate::hyper::{HyperParams, InitializationType};
use crate::init;
use crate::model::{ModelParams, Param};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the per-sub-step statistics series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsTriple {
    /// Mean squared residual over the training set.
    pub objective: f32,
    /// Top-1 accuracy on the training set.
    pub train_accuracy: f32,
    /// Top-1 accuracy on the test set (0.0 when there is no test split).
    pub test_accuracy: f32,
}

/// One ProtoNN training run: hyperparameters, model state, statistics and
/// the session random generator.
///
/// # Examples
///
/// ```
/// use prototipo::prelude::*;
///
/// let mut hyper = HyperParams::new(4, 2)
///     .with_projection_dim(2)
///     .with_n_prototypes(2)
///     .with_iters(2)
///     .with_epochs(2)
///     .with_batch_size(8);
///
/// let mut data = Dataset::streaming(4, 2);
/// for i in 0..20 {
///     let v = if i % 2 == 0 { [1.0, 0.0, 0.1, 0.0] } else { [0.0, 1.0, 0.0, 0.1] };
///     data.feed_dense(&v, &[i % 2]).unwrap();
/// }
/// data.finalize(&mut hyper).unwrap();
///
/// let mut session = TrainingSession::new(hyper).unwrap();
/// session.run(&mut data).unwrap();
/// assert_eq!(session.stats().len(), 2 * 3 + 1);
/// ```
#[derive(Debug)]
pub struct TrainingSession {
    hyper: HyperParams,
    params: Option<ModelParams>,
    stats: Vec<StatsTriple>,
    rng: StdRng,
}

impl TrainingSession {
    /// Validates the hyperparameters and seeds the session generator.
    ///
    /// # Errors
    ///
    /// Returns an error if the hyperparameters violate an invariant.
    pub fn new(hyper: HyperParams) -> Result<Self> {
        hyper.validate()?;
        let rng = StdRng::seed_from_u64(hyper.seed);
        Ok(Self {
            hyper,
            params: None,
            stats: Vec::new(),
            rng,
        })
    }

    /// The session hyperparameters (n_train/n_prototypes/gamma may have been
    /// back-filled since construction).
    #[must_use]
    pub fn hyper(&self) -> &HyperParams {
        &self.hyper
    }

    /// Per-sub-step statistics recorded so far.
    #[must_use]
    pub fn stats(&self) -> &[StatsTriple] {
        &self.stats
    }

    /// The model parameters.
    ///
    /// # Panics
    ///
    /// Panics if the model is not initialized. Call `run()` or
    /// `initialize()` first.
    #[must_use]
    pub fn params(&self) -> &ModelParams {
        self.params
            .as_ref()
            .expect("Model not initialized. Call run() first.")
    }

    /// Consumes the session, returning the learned parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the model was never initialized.
    pub fn into_params(self) -> Result<ModelParams> {
        self.params.ok_or_else(|| "model was never initialized".into())
    }

    /// Builds initial W, B, Z and gamma with the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is `Predefined` (use
    /// [`TrainingSession::initialize_predefined`]) or initialization fails.
    pub fn initialize(&mut self, data: &Dataset) -> Result<()> {
        if !data.is_finalized() {
            return Err("Dataset must be finalized before initialization".into());
        }
        let params = init::initialize(&mut self.hyper, data, &mut self.rng)?;
        self.params = Some(params);
        Ok(())
    }

    /// Loads initial parameters from predefined model files.
    ///
    /// # Errors
    ///
    /// Returns an error if the files are missing, malformed, or mismatch the
    /// declared dimensions.
    pub fn initialize_predefined(&mut self, model_dir: &Path) -> Result<()> {
        let params = init::initialize_predefined(&mut self.hyper, model_dir)?;
        self.params = Some(params);
        Ok(())
    }

    /// Runs the full training pipeline: normalize, initialize (if not done
    /// already), then `iters` alternating rounds.
    ///
    /// Blocks until all rounds complete; there is no mid-run cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the data store is not finalized or a pipeline
    /// stage fails.
    pub fn run(&mut self, data: &mut Dataset) -> Result<()> {
        if !data.is_finalized() {
            return Err("Dataset must be finalized before training".into());
        }
        data.normalize(self.hyper.normalization)?;

        if self.params.is_none() {
            if self.hyper.initialization == InitializationType::Predefined {
                return Err(
                    "predefined initialization requires initialize_predefined before run".into(),
                );
            }
            self.initialize(data)?;
        }

        self.alt_min(data)
    }

    fn alt_min(&mut self, data: &Dataset) -> Result<()> {
        self.stats.clear();
        self.push_stats(data)?;

        for round in 0..self.hyper.iters {
            for which in [Param::W, Param::Z, Param::B] {
                self.update_param(which, data)?;
                self.push_stats(data)?;
                let last = self.stats[self.stats.len() - 1];
                tracing::info!(
                    round,
                    param = ?which,
                    objective = last.objective,
                    train_accuracy = last.train_accuracy,
                    test_accuracy = last.test_accuracy,
                    "sub-step complete"
                );
            }
        }
        Ok(())
    }

    /// `epochs` shuffled mini-batch proximal-gradient passes for one
    /// parameter.
    fn update_param(&mut self, which: Param, data: &Dataset) -> Result<()> {
        let n = data.n_train();
        let mut indices: Vec<usize> = (0..n).collect();
        let lambda = match which {
            Param::W => self.hyper.lambda_w,
            Param::Z => self.hyper.lambda_z,
            Param::B => self.hyper.lambda_b,
        };

        let mut step = 0usize;
        for _ in 0..self.hyper.epochs {
            indices.shuffle(&mut self.rng);
            for chunk in indices.chunks(self.hyper.batch_size) {
                let eta = self.hyper.learning_rate / (1.0 + step as f32).sqrt();
                let grad = self.gradient(which, data.x_train(), data.y_train(), chunk)?;
                let params = self.params.as_mut().ok_or("model not initialized")?;
                let target = match which {
                    Param::W => &mut params.w,
                    Param::Z => &mut params.z,
                    Param::B => &mut params.b,
                };
                target.add_scaled(&grad, -eta)?;
                hard_threshold(target, lambda);
                step += 1;
            }
        }
        Ok(())
    }

    /// Kernel-weighted squared-loss gradient for `which` over one batch,
    /// normalized by the batch size.
    fn gradient(
        &self,
        which: Param,
        x: &Matrix<f32>,
        y: &Matrix<f32>,
        chunk: &[usize],
    ) -> Result<Matrix<f32>> {
        let params = self.params.as_ref().ok_or("model not initialized")?;
        let xs = x.columns(chunk);
        let ys = y.columns(chunk);
        let wx = params.w.matmul(&xs)?;
        let kernel = gaussian_kernel(&params.b, &wx, params.gamma);
        let residual = ys.sub(&params.z.matmul(&kernel)?)?;
        let nb = chunk.len() as f32;
        let g2 = params.gamma * params.gamma;

        match which {
            Param::Z => {
                // dL/dZ = -2 R K^T
                Ok(residual
                    .matmul(&kernel.transpose())?
                    .mul_scalar(-2.0 / nb))
            }
            Param::B => {
                // T = (Z^T R) . K; dL/dB = 4 g^2 (B diag(rowsum T) - WX T^T)
                let t = params.z.transpose().matmul(&residual)?.hadamard(&kernel)?;
                let mut weighted_b = params.b.clone();
                for (j, &s) in t.row_sums().iter().enumerate() {
                    weighted_b.scale_column(j, s);
                }
                let cross = wx.matmul(&t.transpose())?;
                Ok(weighted_b.sub(&cross)?.mul_scalar(4.0 * g2 / nb))
            }
            Param::W => {
                // dL/dW = -4 g^2 (B T - WX diag(colsum T)) X^T
                let t = params.z.transpose().matmul(&residual)?.hadamard(&kernel)?;
                let bt = params.b.matmul(&t)?;
                let mut weighted_wx = wx;
                for (i, &s) in t.col_sums().iter().enumerate() {
                    weighted_wx.scale_column(i, s);
                }
                Ok(bt
                    .sub(&weighted_wx)?
                    .matmul(&xs.transpose())?
                    .mul_scalar(-4.0 * g2 / nb))
            }
        }
    }

    fn push_stats(&mut self, data: &Dataset) -> Result<()> {
        let (objective, train_accuracy) = self.evaluate(data.x_train(), data.y_train())?;
        let test_accuracy = if data.n_test() > 0 {
            self.evaluate(data.x_test(), data.y_test())?.1
        } else {
            0.0
        };
        self.stats.push(StatsTriple {
            objective,
            train_accuracy,
            test_accuracy,
        });
        Ok(())
    }

    /// Mean squared residual and top-1 accuracy over a full split.
    fn evaluate(&self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<(f32, f32)> {
        let n = x.n_cols();
        if n == 0 {
            return Ok((0.0, 0.0));
        }
        let params = self.params.as_ref().ok_or("model not initialized")?;
        let wx = params.w.matmul(x)?;
        let kernel = gaussian_kernel(&params.b, &wx, params.gamma);
        let scores = params.z.matmul(&kernel)?;

        let mut objective = 0.0f32;
        let mut correct = 0usize;
        for col in 0..n {
            for row in 0..y.n_rows() {
                let r = y.get(row, col) - scores.get(row, col);
                objective += r * r;
            }
            if scores.column(col).argmax() == y.column(col).argmax() {
                correct += 1;
            }
        }
        Ok((objective / n as f32, correct as f32 / n as f32))
    }
}

/// Gaussian RBF kernel matrix: `K[j, i] = exp(-gamma^2 ||b_j - p_i||^2)`.
fn gaussian_kernel(b: &Matrix<f32>, projected: &Matrix<f32>, gamma: f32) -> Matrix<f32> {
    let (dim, m) = b.shape();
    let n = projected.n_cols();
    let g2 = gamma * gamma;
    let mut kernel = Matrix::zeros(m, n);
    for j in 0..m {
        for i in 0..n {
            let mut dist2 = 0.0f32;
            for row in 0..dim {
                let diff = b.get(row, j) - projected.get(row, i);
                dist2 += diff * diff;
            }
            kernel.set(j, i, (-g2 * dist2).exp());
        }
    }
    kernel
}

/// Hard sparsity projection: zeroes every entry whose magnitude falls below
/// the `ceil(fraction * numel)`-th largest. `fraction >= 1.0` is a no-op;
/// entries tied with the cutoff magnitude are all retained.
fn hard_threshold(m: &mut Matrix<f32>, fraction: f32) {
    if fraction >= 1.0 {
        return;
    }
    let data = m.as_mut_slice();
    let numel = data.len();
    if numel == 0 {
        return;
    }
    let keep = ((fraction * numel as f32).ceil() as usize).clamp(1, numel);
    if keep == numel {
        return;
    }
    let mut magnitudes: Vec<f32> = data.iter().map(|v| v.abs()).collect();
    let (_, cutoff, _) = magnitudes.select_nth_unstable_by(numel - keep, f32::total_cmp);
    let cutoff = *cutoff;
    for v in data.iter_mut() {
        if v.abs() < cutoff {
            *v = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyper::NormalizationType;
    use rand::Rng;

    /// Two well-separated classes in 4 dimensions.
    fn separable_data(hyper: &mut HyperParams, n: usize) -> Dataset {
        let mut data = Dataset::streaming(4, 2);
        let mut rng = StdRng::seed_from_u64(100);
        for i in 0..n {
            let class = i % 2;
            let base: [f32; 4] = if class == 0 {
                [1.0, 0.0, 1.0, 0.0]
            } else {
                [0.0, 1.0, 0.0, 1.0]
            };
            let values: Vec<f32> = base
                .iter()
                .map(|&v| v + rng.gen_range(-0.05..0.05))
                .collect();
            data.feed_dense(&values, &[class]).unwrap();
        }
        data.finalize(hyper).unwrap();
        data
    }

    fn small_hyper() -> HyperParams {
        HyperParams::new(4, 2)
            .with_projection_dim(3)
            .with_n_prototypes(2)
            .with_iters(3)
            .with_epochs(2)
            .with_batch_size(8)
            .with_seed(21)
            .with_initialization(InitializationType::PerClassKmeans)
    }

    #[test]
    fn test_stats_length_is_iters_times_three_plus_one() {
        let mut hyper = small_hyper();
        let mut data = separable_data(&mut hyper, 40);
        let iters = hyper.iters;
        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();
        assert_eq!(session.stats().len(), iters * 3 + 1);
    }

    #[test]
    fn test_training_learns_separable_data() {
        let mut hyper = small_hyper();
        let mut data = separable_data(&mut hyper, 40);
        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();

        let last = session.stats().last().unwrap();
        assert!(
            last.train_accuracy >= 0.9,
            "train accuracy {}",
            last.train_accuracy
        );
        assert!(last.objective.is_finite());
        assert!(session.params().gamma > 0.0);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let mut h1 = small_hyper();
        let mut d1 = separable_data(&mut h1, 40);
        let mut s1 = TrainingSession::new(h1).unwrap();
        s1.run(&mut d1).unwrap();

        let mut h2 = small_hyper();
        let mut d2 = separable_data(&mut h2, 40);
        let mut s2 = TrainingSession::new(h2).unwrap();
        s2.run(&mut d2).unwrap();

        assert_eq!(s1.stats(), s2.stats());
        assert_eq!(s1.params().w, s2.params().w);
    }

    #[test]
    fn test_test_split_accuracy_recorded() {
        let mut hyper = small_hyper().with_n_train(20).with_n_test(10);
        // Build bulk matrices: columns as samples.
        let mut x_train = Matrix::zeros(4, 20);
        let mut y_train = Matrix::zeros(2, 20);
        let mut x_test = Matrix::zeros(4, 10);
        let mut y_test = Matrix::zeros(2, 10);
        for i in 0..20 {
            let class = i % 2;
            x_train.set(if class == 0 { 0 } else { 1 }, i, 1.0);
            y_train.set(class, i, 1.0);
        }
        for i in 0..10 {
            let class = i % 2;
            x_test.set(if class == 0 { 0 } else { 1 }, i, 1.0);
            y_test.set(class, i, 1.0);
        }
        let mut data = Dataset::from_matrices(x_train, y_train, x_test, y_test).unwrap();
        data.finalize(&mut hyper).unwrap();

        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();
        let last = session.stats().last().unwrap();
        assert!(last.test_accuracy > 0.0);
    }

    #[test]
    fn test_sparsity_projection_enforced_during_training() {
        let mut hyper = small_hyper().with_lambdas(0.5, 1.0, 1.0);
        let mut data = separable_data(&mut hyper, 40);
        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();

        let w = &session.params().w;
        let numel = w.n_rows() * w.n_cols();
        let budget = ((0.5 * numel as f32).ceil()) as usize;
        assert!(
            w.nnz() <= budget,
            "nnz {} exceeds sparsity budget {budget}",
            w.nnz()
        );
    }

    #[test]
    fn test_run_requires_finalized_data() {
        let hyper = small_hyper();
        let mut data = Dataset::streaming(4, 2);
        data.feed_dense(&[1.0, 0.0, 0.0, 0.0], &[0]).unwrap();
        let mut session = TrainingSession::new(hyper).unwrap();
        assert!(session.run(&mut data).is_err());
    }

    #[test]
    fn test_run_with_predefined_strategy_needs_explicit_init() {
        let mut hyper = small_hyper().with_initialization(InitializationType::Predefined);
        let mut data = separable_data(&mut hyper, 40);
        let mut session = TrainingSession::new(hyper).unwrap();
        assert!(session.run(&mut data).is_err());
    }

    #[test]
    fn test_normalization_applied_inside_run() {
        let mut hyper = small_hyper().with_normalization(NormalizationType::L2);
        let mut data = separable_data(&mut hyper, 40);
        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();
        let norm = data.x_train().column(0).norm();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hard_threshold_keeps_top_magnitudes() {
        let mut m = Matrix::from_vec(2, 3, vec![0.1, -5.0, 0.2, 3.0, -0.3, 0.4]).unwrap();
        hard_threshold(&mut m, 0.34); // ceil(0.34 * 6) = 3 entries kept
        let kept: Vec<f32> = m.as_slice().iter().copied().filter(|&v| v != 0.0).collect();
        assert_eq!(kept.len(), 3);
        assert!(kept.contains(&-5.0));
        assert!(kept.contains(&3.0));
        assert!(kept.contains(&0.4));
    }

    #[test]
    fn test_hard_threshold_full_fraction_is_noop() {
        let mut m = Matrix::from_vec(1, 3, vec![0.1, 0.2, 0.3]).unwrap();
        let before = m.clone();
        hard_threshold(&mut m, 1.0);
        assert_eq!(m, before);
    }

    #[test]
    fn test_gaussian_kernel_values() {
        let b = Matrix::from_vec(1, 1, vec![0.0]).unwrap();
        let p = Matrix::from_vec(1, 2, vec![0.0, 1.0]).unwrap();
        let k = gaussian_kernel(&b, &p, 2.0);
        assert!((k.get(0, 0) - 1.0).abs() < 1e-6);
        assert!((k.get(0, 1) - (-4.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_into_params() {
        let mut hyper = small_hyper();
        let mut data = separable_data(&mut hyper, 40);
        let mut session = TrainingSession::new(hyper).unwrap();
        session.run(&mut data).unwrap();
        let params = session.into_params().unwrap();
        assert_eq!(params.b.n_cols(), 2);
    }
}
