//! Hyperparameters for a ProtoNN training run.
//!
//! [`HyperParams`] is built with `with_*` setters, validated once, and then
//! treated as immutable for the rest of the session. The only fields that may
//! still change afterwards are `n_train`/`n_test` (back-filled by
//! [`crate::data::Dataset::finalize`] when streaming ingestion did not know
//! the counts up front), `n_prototypes` (frozen to the centroid count
//! actually produced by k-means initialization) and `gamma` (set by the
//! median heuristic).

use crate::error::{PrototipoError, Result};
use serde::{Deserialize, Serialize};

/// Feature normalization applied before initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationType {
    /// Leave features untouched (default).
    None,
    /// Scale every sample column to unit Euclidean norm.
    L2,
    /// Rescale each feature row into [0, 1] using train-set extrema.
    MinMax,
}

/// Strategy for producing the initial W, B, Z and gamma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitializationType {
    /// Load W, Z, B, gamma from TSV files in a model directory.
    Predefined,
    /// Gaussian W; prototypes seeded from random training samples.
    Sample,
    /// k-means++ within each class's projected points (m/l clusters each).
    PerClassKmeans,
    /// k-means++ over all projected points, ignoring class boundaries.
    OverallKmeans,
}

impl NormalizationType {
    /// Name used in run reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationType::None => "none",
            NormalizationType::L2 => "l2-normalization",
            NormalizationType::MinMax => "minmax-normalization",
        }
    }
}

impl InitializationType {
    /// Name used in run reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InitializationType::Predefined => "predefined",
            InitializationType::Sample => "sample",
            InitializationType::PerClassKmeans => "perClassKmeans",
            InitializationType::OverallKmeans => "overallKmeans",
        }
    }
}

/// Structural and optimization knobs for one training run.
///
/// # Examples
///
/// ```
/// use prototipo::prelude::*;
///
/// let hyper = HyperParams::new(20, 3)
///     .with_projection_dim(5)
///     .with_n_prototypes(6)
///     .with_seed(42);
/// assert!(hyper.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperParams {
    /// Embedding dimension d of the projected space.
    pub projection_dim: usize,
    /// Input feature dimension D.
    pub input_dim: usize,
    /// Number of classes l.
    pub n_labels: usize,
    /// Number of prototypes m.
    pub n_prototypes: usize,
    /// Training sample count; 0 means unknown until finalize.
    pub n_train: usize,
    /// Test sample count; 0 means none.
    pub n_test: usize,
    /// Gaussian kernel bandwidth; 0.0 means unset until initialization.
    pub gamma: f32,
    /// Numerator for the median-heuristic bandwidth estimate.
    pub gamma_numerator: f32,
    /// Fraction of W entries retained by the sparsity projection, in (0, 1].
    pub lambda_w: f32,
    /// Fraction of Z entries retained by the sparsity projection, in (0, 1].
    pub lambda_z: f32,
    /// Fraction of B entries retained by the sparsity projection, in (0, 1].
    pub lambda_b: f32,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Gradient passes over the training set per parameter per outer round.
    pub epochs: usize,
    /// Outer alternating rounds.
    pub iters: usize,
    /// Seed for the session's random generator.
    pub seed: u64,
    /// Base step size; decayed as 1/sqrt(t) over batch steps.
    pub learning_rate: f32,
    /// Feature normalization strategy.
    pub normalization: NormalizationType,
    /// Model initialization strategy.
    pub initialization: InitializationType,
}

impl HyperParams {
    /// Creates hyperparameters for `input_dim` features and `n_labels`
    /// classes, with defaults for everything else.
    #[must_use]
    pub fn new(input_dim: usize, n_labels: usize) -> Self {
        Self {
            projection_dim: 15,
            input_dim,
            n_labels,
            n_prototypes: 20,
            n_train: 0,
            n_test: 0,
            gamma: 0.0,
            gamma_numerator: 1.0,
            lambda_w: 1.0,
            lambda_z: 1.0,
            lambda_b: 1.0,
            batch_size: 1024,
            epochs: 20,
            iters: 20,
            seed: 42,
            learning_rate: 0.05,
            normalization: NormalizationType::None,
            initialization: InitializationType::Sample,
        }
    }

    /// Sets the embedding dimension d.
    #[must_use]
    pub fn with_projection_dim(mut self, d: usize) -> Self {
        self.projection_dim = d;
        self
    }

    /// Sets the number of prototypes m.
    #[must_use]
    pub fn with_n_prototypes(mut self, m: usize) -> Self {
        self.n_prototypes = m;
        self
    }

    /// Declares the training sample count (leave 0 for streaming ingestion).
    #[must_use]
    pub fn with_n_train(mut self, n: usize) -> Self {
        self.n_train = n;
        self
    }

    /// Declares the test sample count.
    #[must_use]
    pub fn with_n_test(mut self, n: usize) -> Self {
        self.n_test = n;
        self
    }

    /// Sets the median-heuristic numerator.
    #[must_use]
    pub fn with_gamma_numerator(mut self, g: f32) -> Self {
        self.gamma_numerator = g;
        self
    }

    /// Sets the sparsity budgets for W, Z and B.
    #[must_use]
    pub fn with_lambdas(mut self, lambda_w: f32, lambda_z: f32, lambda_b: f32) -> Self {
        self.lambda_w = lambda_w;
        self.lambda_z = lambda_z;
        self.lambda_b = lambda_b;
        self
    }

    /// Sets the mini-batch size.
    #[must_use]
    pub fn with_batch_size(mut self, b: usize) -> Self {
        self.batch_size = b;
        self
    }

    /// Sets epochs per parameter per outer round.
    #[must_use]
    pub fn with_epochs(mut self, e: usize) -> Self {
        self.epochs = e;
        self
    }

    /// Sets the number of outer alternating rounds.
    #[must_use]
    pub fn with_iters(mut self, iters: usize) -> Self {
        self.iters = iters;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the base step size.
    #[must_use]
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the normalization strategy.
    #[must_use]
    pub fn with_normalization(mut self, n: NormalizationType) -> Self {
        self.normalization = n;
        self
    }

    /// Sets the initialization strategy.
    #[must_use]
    pub fn with_initialization(mut self, i: InitializationType) -> Self {
        self.initialization = i;
        self
    }

    /// Checks structural invariants that must hold before training starts.
    ///
    /// # Errors
    ///
    /// Returns [`PrototipoError::InvalidHyperparameter`] on the first violated
    /// constraint. The `n_prototypes <= n_train` invariant is checked later,
    /// at data finalization, because streaming ingestion does not know
    /// `n_train` here.
    pub fn validate(&self) -> Result<()> {
        if self.projection_dim == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "projection_dim",
                self.projection_dim,
                ">0",
            ));
        }
        if self.input_dim == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "input_dim",
                self.input_dim,
                ">0",
            ));
        }
        if self.n_labels == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "n_labels",
                self.n_labels,
                ">0",
            ));
        }
        if self.n_prototypes == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "n_prototypes",
                self.n_prototypes,
                ">0",
            ));
        }
        if self.batch_size == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "batch_size",
                self.batch_size,
                ">0",
            ));
        }
        if self.epochs == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "epochs",
                self.epochs,
                ">0",
            ));
        }
        if self.iters == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "iters", self.iters, ">0",
            ));
        }
        for (name, lambda) in [
            ("lambda_w", self.lambda_w),
            ("lambda_z", self.lambda_z),
            ("lambda_b", self.lambda_b),
        ] {
            if !(lambda > 0.0 && lambda <= 1.0) {
                return Err(PrototipoError::invalid_hyperparameter(
                    name, lambda, "in (0, 1]",
                ));
            }
        }
        if self.gamma_numerator <= 0.0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "gamma_numerator",
                self.gamma_numerator,
                ">0",
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "learning_rate",
                self.learning_rate,
                ">0",
            ));
        }
        if self.initialization == InitializationType::PerClassKmeans
            && self.n_prototypes % self.n_labels != 0
        {
            return Err(PrototipoError::invalid_hyperparameter(
                "n_prototypes",
                self.n_prototypes,
                "an exact multiple of n_labels for per-class k-means",
            ));
        }
        Ok(())
    }

    /// Deterministic results-subdirectory name derived from the knobs that
    /// shape the run.
    #[must_use]
    pub fn subdir_name(&self) -> String {
        format!(
            "d{}_m{}_lw{}_lz{}_lb{}_gn{}_bs{}_e{}_it{}_s{}_{}_{}",
            self.projection_dim,
            self.n_prototypes,
            self.lambda_w,
            self.lambda_z,
            self.lambda_b,
            self.gamma_numerator,
            self.batch_size,
            self.epochs,
            self.iters,
            self.seed,
            self.initialization.as_str(),
            self.normalization.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let hyper = HyperParams::new(20, 3);
        assert!(hyper.validate().is_ok());
    }

    #[test]
    fn test_zero_projection_dim_rejected() {
        let hyper = HyperParams::new(20, 3).with_projection_dim(0);
        assert!(hyper.validate().is_err());
    }

    #[test]
    fn test_lambda_out_of_range_rejected() {
        let hyper = HyperParams::new(20, 3).with_lambdas(0.5, 1.5, 0.5);
        let err = hyper.validate().unwrap_err();
        assert!(err.to_string().contains("lambda_z"));

        let hyper = HyperParams::new(20, 3).with_lambdas(0.0, 1.0, 1.0);
        assert!(hyper.validate().is_err());
    }

    #[test]
    fn test_per_class_kmeans_multiple_constraint() {
        let hyper = HyperParams::new(20, 3)
            .with_n_prototypes(7)
            .with_initialization(InitializationType::PerClassKmeans);
        assert!(hyper.validate().is_err());

        let hyper = hyper.with_n_prototypes(9);
        assert!(hyper.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let hyper = HyperParams::new(20, 3).with_batch_size(0);
        assert!(hyper.validate().is_err());
    }

    #[test]
    fn test_subdir_name_deterministic() {
        let a = HyperParams::new(20, 3).with_seed(7);
        let b = HyperParams::new(20, 3).with_seed(7);
        assert_eq!(a.subdir_name(), b.subdir_name());
        let c = HyperParams::new(20, 3).with_seed(8);
        assert_ne!(a.subdir_name(), c.subdir_name());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(InitializationType::OverallKmeans.as_str(), "overallKmeans");
        assert_eq!(NormalizationType::MinMax.as_str(), "minmax-normalization");
    }
}
