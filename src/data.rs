//! Data store for training and test matrices.
//!
//! A [`Dataset`] is filled either in bulk from pre-built matrices or
//! incrementally, one labeled point at a time, by a caller who does not know
//! the sample count in advance. Either way it must be finalized exactly once
//! before training; finalization freezes the matrices and reconciles the
//! observed counts with the declared hyperparameters.

use crate::error::{PrototipoError, Result};
use crate::hyper::{HyperParams, NormalizationType};
use crate::preprocessing;
use crate::primitives::Matrix;

/// How the data store was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Matrices supplied up front; declared counts must match exactly.
    Bulk,
    /// Points fed one at a time; counts are back-filled at finalize.
    Streaming,
}

/// Holds feature matrices (D x N, columns are samples) and one-hot/soft
/// label matrices (L x N) for train and test splits.
///
/// # Examples
///
/// ```
/// use prototipo::prelude::*;
///
/// let mut hyper = HyperParams::new(2, 2).with_n_prototypes(2);
/// let mut data = Dataset::streaming(2, 2);
/// data.feed_dense(&[0.0, 1.0], &[0]).unwrap();
/// data.feed_dense(&[1.0, 0.0], &[1]).unwrap();
/// data.finalize(&mut hyper).unwrap();
/// assert_eq!(hyper.n_train, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    input_dim: usize,
    n_labels: usize,
    mode: IngestMode,
    // Streaming buffers, drained at finalize.
    pending_x: Vec<Vec<f32>>,
    pending_labels: Vec<Vec<usize>>,
    x_train: Option<Matrix<f32>>,
    y_train: Option<Matrix<f32>>,
    x_test: Option<Matrix<f32>>,
    y_test: Option<Matrix<f32>>,
    finalized: bool,
}

impl Dataset {
    /// Creates a data store from pre-built matrices.
    ///
    /// `x_*` are D x N with columns as samples, `y_*` are L x N. Pass
    /// zero-column test matrices when there is no test split.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch error if the train/test pairs disagree on
    /// column counts or the label matrices disagree on row count.
    pub fn from_matrices(
        x_train: Matrix<f32>,
        y_train: Matrix<f32>,
        x_test: Matrix<f32>,
        y_test: Matrix<f32>,
    ) -> Result<Self> {
        if x_train.n_cols() != y_train.n_cols() {
            return Err(PrototipoError::dimension_mismatch(
                "train feature/label columns",
                x_train.n_cols(),
                y_train.n_cols(),
            ));
        }
        if x_test.n_cols() != y_test.n_cols() {
            return Err(PrototipoError::dimension_mismatch(
                "test feature/label columns",
                x_test.n_cols(),
                y_test.n_cols(),
            ));
        }
        if x_test.n_cols() > 0 && x_test.n_rows() != x_train.n_rows() {
            return Err(PrototipoError::dimension_mismatch(
                "test feature rows",
                x_train.n_rows(),
                x_test.n_rows(),
            ));
        }
        if y_test.n_cols() > 0 && y_test.n_rows() != y_train.n_rows() {
            return Err(PrototipoError::dimension_mismatch(
                "test label rows",
                y_train.n_rows(),
                y_test.n_rows(),
            ));
        }
        Ok(Self {
            input_dim: x_train.n_rows(),
            n_labels: y_train.n_rows(),
            mode: IngestMode::Bulk,
            pending_x: Vec::new(),
            pending_labels: Vec::new(),
            x_train: Some(x_train),
            y_train: Some(y_train),
            x_test: Some(x_test),
            y_test: Some(y_test),
            finalized: false,
        })
    }

    /// Creates an empty data store for point-by-point ingestion.
    #[must_use]
    pub fn streaming(input_dim: usize, n_labels: usize) -> Self {
        Self {
            input_dim,
            n_labels,
            mode: IngestMode::Streaming,
            pending_x: Vec::new(),
            pending_labels: Vec::new(),
            x_train: None,
            y_train: None,
            x_test: None,
            y_test: None,
            finalized: false,
        }
    }

    /// Returns how this data store is being filled.
    #[must_use]
    pub fn ingest_mode(&self) -> IngestMode {
        self.mode
    }

    /// Returns true once [`Dataset::finalize`] has succeeded.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Feeds one dense training point with its label indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is bulk-mode or already finalized, if
    /// the value length differs from the input dimension, or if any label
    /// index is out of range.
    pub fn feed_dense(&mut self, values: &[f32], labels: &[usize]) -> Result<()> {
        self.check_feedable()?;
        if values.len() != self.input_dim {
            return Err(PrototipoError::dimension_mismatch(
                "feature values",
                self.input_dim,
                values.len(),
            ));
        }
        self.check_labels(labels)?;
        self.pending_x.push(values.to_vec());
        self.pending_labels.push(labels.to_vec());
        Ok(())
    }

    /// Feeds one sparse training point as (value, index) pairs with its
    /// label indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is bulk-mode or already finalized, if
    /// `values` and `indices` differ in length, or if any feature/label index
    /// is out of range.
    pub fn feed_sparse(&mut self, values: &[f32], indices: &[usize], labels: &[usize]) -> Result<()> {
        self.check_feedable()?;
        if values.len() != indices.len() {
            return Err(PrototipoError::dimension_mismatch(
                "sparse values/indices",
                values.len(),
                indices.len(),
            ));
        }
        let mut dense = vec![0.0; self.input_dim];
        for (&v, &i) in values.iter().zip(indices.iter()) {
            if i >= self.input_dim {
                return Err(PrototipoError::dimension_mismatch(
                    "feature index bound",
                    self.input_dim,
                    i,
                ));
            }
            dense[i] = v;
        }
        self.check_labels(labels)?;
        self.pending_x.push(dense);
        self.pending_labels.push(labels.to_vec());
        Ok(())
    }

    /// Freezes the matrices and reconciles counts with `hyper`.
    ///
    /// For streaming ingestion with `hyper.n_train == 0`, the observed point
    /// count is written back into `hyper.n_train` (and `n_test` forced to 0).
    /// Otherwise the declared counts must match what was actually fed.
    ///
    /// # Errors
    ///
    /// Returns [`PrototipoError::IngestMismatch`] on count disagreement, and
    /// an invalid-hyperparameter error when no training points exist or
    /// `n_prototypes > n_train`.
    pub fn finalize(&mut self, hyper: &mut HyperParams) -> Result<()> {
        if self.finalized {
            return Err("Dataset already finalized".into());
        }

        if self.mode == IngestMode::Streaming {
            let n = self.pending_x.len();
            let mut x_data = vec![0.0f32; self.input_dim * n];
            for (col, point) in self.pending_x.iter().enumerate() {
                for (row, &v) in point.iter().enumerate() {
                    x_data[row * n + col] = v;
                }
            }
            let mut y_data = vec![0.0f32; self.n_labels * n];
            for (col, labels) in self.pending_labels.iter().enumerate() {
                for &label in labels {
                    y_data[label * n + col] = 1.0;
                }
            }
            self.x_train = Some(
                Matrix::from_vec(self.input_dim, n, x_data)
                    .map_err(PrototipoError::from)?,
            );
            self.y_train = Some(
                Matrix::from_vec(self.n_labels, n, y_data)
                    .map_err(PrototipoError::from)?,
            );
            self.x_test = Some(Matrix::zeros(self.input_dim, 0));
            self.y_test = Some(Matrix::zeros(self.n_labels, 0));
            self.pending_x.clear();
            self.pending_labels.clear();
        }

        let observed_train = self.x_train.as_ref().map_or(0, Matrix::n_cols);
        let observed_test = self.x_test.as_ref().map_or(0, Matrix::n_cols);

        if hyper.n_train == 0 && self.mode == IngestMode::Streaming {
            // Streaming callers do not know the point count beforehand; bulk
            // ingestion always declares counts and never gets a back-fill.
            hyper.n_train = observed_train;
            hyper.n_test = 0;
        } else {
            if hyper.n_train != observed_train {
                return Err(PrototipoError::IngestMismatch {
                    what: "training samples".to_string(),
                    declared: hyper.n_train,
                    observed: observed_train,
                });
            }
            if hyper.n_test != observed_test {
                return Err(PrototipoError::IngestMismatch {
                    what: "test samples".to_string(),
                    declared: hyper.n_test,
                    observed: observed_test,
                });
            }
        }

        if hyper.n_train == 0 {
            return Err(PrototipoError::invalid_hyperparameter(
                "n_train", 0, ">0 after ingestion",
            ));
        }
        if hyper.n_prototypes > hyper.n_train {
            return Err(PrototipoError::invalid_hyperparameter(
                "n_prototypes",
                hyper.n_prototypes,
                "<= n_train",
            ));
        }

        self.finalized = true;
        Ok(())
    }

    /// Applies the configured normalization in place, train and test.
    ///
    /// Must be called after finalize; [`NormalizationType::None`] is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the data store is not finalized.
    pub fn normalize(&mut self, normalization: NormalizationType) -> Result<()> {
        if !self.finalized {
            return Err("Dataset must be finalized before normalization".into());
        }
        match normalization {
            NormalizationType::None => {}
            NormalizationType::MinMax => {
                let mut xtr = self.x_train.take().ok_or("train features missing")?;
                let mut xte = self.x_test.take().ok_or("test features missing")?;
                preprocessing::min_max_normalize(&mut xtr, &mut xte);
                self.x_train = Some(xtr);
                self.x_test = Some(xte);
                tracing::info!("completed min-max normalization of data");
            }
            NormalizationType::L2 => {
                if let Some(x) = self.x_train.as_mut() {
                    preprocessing::l2_normalize(x);
                }
                if let Some(x) = self.x_test.as_mut() {
                    preprocessing::l2_normalize(x);
                }
                tracing::info!("completed L2 normalization of data");
            }
        }
        Ok(())
    }

    /// Number of training samples (0 before finalize in streaming mode).
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.as_ref().map_or(0, Matrix::n_cols)
    }

    /// Number of test samples.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.x_test.as_ref().map_or(0, Matrix::n_cols)
    }

    /// Input feature dimension D.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of classes L.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Training feature matrix.
    ///
    /// # Panics
    ///
    /// Panics if the data store is not finalized. Call `finalize()` first.
    #[must_use]
    pub fn x_train(&self) -> &Matrix<f32> {
        self.x_train
            .as_ref()
            .expect("Dataset not finalized. Call finalize() first.")
    }

    /// Training label matrix.
    ///
    /// # Panics
    ///
    /// Panics if the data store is not finalized. Call `finalize()` first.
    #[must_use]
    pub fn y_train(&self) -> &Matrix<f32> {
        self.y_train
            .as_ref()
            .expect("Dataset not finalized. Call finalize() first.")
    }

    /// Test feature matrix (may have zero columns).
    ///
    /// # Panics
    ///
    /// Panics if the data store is not finalized. Call `finalize()` first.
    #[must_use]
    pub fn x_test(&self) -> &Matrix<f32> {
        self.x_test
            .as_ref()
            .expect("Dataset not finalized. Call finalize() first.")
    }

    /// Test label matrix (may have zero columns).
    ///
    /// # Panics
    ///
    /// Panics if the data store is not finalized. Call `finalize()` first.
    #[must_use]
    pub fn y_test(&self) -> &Matrix<f32> {
        self.y_test
            .as_ref()
            .expect("Dataset not finalized. Call finalize() first.")
    }

    fn check_feedable(&self) -> Result<()> {
        if self.mode != IngestMode::Streaming {
            return Err("feed_* requires a streaming data store".into());
        }
        if self.finalized {
            return Err("Dataset already finalized".into());
        }
        Ok(())
    }

    fn check_labels(&self, labels: &[usize]) -> Result<()> {
        for &label in labels {
            if label >= self.n_labels {
                return Err(PrototipoError::dimension_mismatch(
                    "label index bound",
                    self.n_labels,
                    label,
                ));
            }
        }
        Ok(())
    }
}
