//! Learned model parameters and their storage representations.
//!
//! [`ModelParams`] owns W (d x D), B (d x m) and Z (l x m) plus the kernel
//! bandwidth gamma. The storage format for serialization is a variant tag
//! chosen at construction; both dense and sparse paths live behind the
//! [`ParamMatrix`] view.

use crate::error::{PrototipoError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Serialization density for model matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageFormat {
    /// All entries stored.
    Dense,
    /// Only nonzero entries stored as (row, col, value) triplets.
    Sparse,
}

/// Which model matrix an exporter call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Projection matrix W (d x D).
    W,
    /// Prototype matrix B (d x m).
    B,
    /// Prototype-label matrix Z (l x m).
    Z,
}

/// A matrix stored as (row, col, value) triplets in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: u32,
    cols: u32,
    entries: Vec<(u32, u32, f32)>,
}

impl SparseMatrix {
    /// Collects the nonzero entries of a dense matrix.
    #[must_use]
    pub fn from_dense(m: &Matrix<f32>) -> Self {
        let mut entries = Vec::with_capacity(m.nnz());
        for row in 0..m.n_rows() {
            for col in 0..m.n_cols() {
                let v = m.get(row, col);
                if v != 0.0 {
                    entries.push((row as u32, col as u32, v));
                }
            }
        }
        Self {
            rows: m.n_rows() as u32,
            cols: m.n_cols() as u32,
            entries,
        }
    }

    /// Builds a sparse matrix from raw triplets.
    ///
    /// # Errors
    ///
    /// Returns an error if any triplet index is out of bounds.
    pub fn from_entries(rows: u32, cols: u32, entries: Vec<(u32, u32, f32)>) -> Result<Self> {
        for &(r, c, _) in &entries {
            if r >= rows || c >= cols {
                return Err(PrototipoError::FormatError {
                    message: format!("sparse entry ({r}, {c}) out of bounds {rows}x{cols}"),
                });
            }
        }
        Ok(Self {
            rows,
            cols,
            entries,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows as usize
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols as usize
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Stored triplets in row-major order.
    #[must_use]
    pub fn entries(&self) -> &[(u32, u32, f32)] {
        &self.entries
    }

    /// Materializes the dense equivalent.
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f32> {
        let mut m = Matrix::zeros(self.n_rows(), self.n_cols());
        for &(r, c, v) in &self.entries {
            m.set(r as usize, c as usize, v);
        }
        m
    }
}

/// Polymorphic view over a model matrix in either storage format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamMatrix {
    /// Dense storage.
    Dense(Matrix<f32>),
    /// Triplet storage.
    Sparse(SparseMatrix),
}

impl ParamMatrix {
    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            ParamMatrix::Dense(m) => m.n_rows(),
            ParamMatrix::Sparse(s) => s.n_rows(),
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        match self {
            ParamMatrix::Dense(m) => m.n_cols(),
            ParamMatrix::Sparse(s) => s.n_cols(),
        }
    }

    /// Multiplies by a dense matrix on the right.
    ///
    /// # Errors
    ///
    /// Returns an error if inner dimensions don't match.
    pub fn multiply(&self, rhs: &Matrix<f32>) -> Result<Matrix<f32>> {
        match self {
            ParamMatrix::Dense(m) => m.matmul(rhs).map_err(PrototipoError::from),
            ParamMatrix::Sparse(s) => {
                if s.n_cols() != rhs.n_rows() {
                    return Err(PrototipoError::dimension_mismatch(
                        "multiply inner dim",
                        s.n_cols(),
                        rhs.n_rows(),
                    ));
                }
                let mut out = Matrix::zeros(s.n_rows(), rhs.n_cols());
                for &(r, c, v) in s.entries() {
                    for j in 0..rhs.n_cols() {
                        let acc = out.get(r as usize, j) + v * rhs.get(c as usize, j);
                        out.set(r as usize, j, acc);
                    }
                }
                Ok(out)
            }
        }
    }

    /// Converts to dense storage.
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f32> {
        match self {
            ParamMatrix::Dense(m) => m.clone(),
            ParamMatrix::Sparse(s) => s.to_dense(),
        }
    }

    /// Converts to sparse storage.
    #[must_use]
    pub fn to_sparse(&self) -> SparseMatrix {
        match self {
            ParamMatrix::Dense(m) => SparseMatrix::from_dense(m),
            ParamMatrix::Sparse(s) => s.clone(),
        }
    }
}

/// Learned parameters of a ProtoNN model.
///
/// Mutated in place by every training sub-step; handed to the exporter only
/// by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Projection matrix, d x D.
    pub w: Matrix<f32>,
    /// Prototypes in projected space, d x m.
    pub b: Matrix<f32>,
    /// Prototype-label associations, l x m.
    pub z: Matrix<f32>,
    /// Gaussian kernel bandwidth.
    pub gamma: f32,
    format: StorageFormat,
}

impl ModelParams {
    /// Assembles model parameters, checking shape consistency.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch error if B's rows differ from W's or
    /// Z's columns differ from B's.
    pub fn new(w: Matrix<f32>, b: Matrix<f32>, z: Matrix<f32>, gamma: f32) -> Result<Self> {
        if b.n_rows() != w.n_rows() {
            return Err(PrototipoError::dimension_mismatch(
                "B rows (projection dim)",
                w.n_rows(),
                b.n_rows(),
            ));
        }
        if z.n_cols() != b.n_cols() {
            return Err(PrototipoError::dimension_mismatch(
                "Z columns (prototypes)",
                b.n_cols(),
                z.n_cols(),
            ));
        }
        Ok(Self {
            w,
            b,
            z,
            gamma,
            format: StorageFormat::Dense,
        })
    }

    /// Chooses the storage format used for serialization and size reporting.
    #[must_use]
    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    /// The storage format chosen at construction.
    #[must_use]
    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Returns the requested matrix as a [`ParamMatrix`] in the model's
    /// storage format.
    #[must_use]
    pub fn param(&self, which: Param) -> ParamMatrix {
        let dense = match which {
            Param::W => &self.w,
            Param::B => &self.b,
            Param::Z => &self.z,
        };
        match self.format {
            StorageFormat::Dense => ParamMatrix::Dense(dense.clone()),
            StorageFormat::Sparse => ParamMatrix::Sparse(SparseMatrix::from_dense(dense)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> ModelParams {
        let w = Matrix::from_vec(2, 3, vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0]).unwrap();
        let b = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let z = Matrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        ModelParams::new(w, b, z, 0.5).unwrap()
    }

    #[test]
    fn test_shape_validation() {
        let w = Matrix::zeros(2, 3);
        let b = Matrix::zeros(3, 2); // wrong row count
        let z = Matrix::zeros(2, 2);
        assert!(ModelParams::new(w, b, z, 1.0).is_err());

        let w = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 2);
        let z = Matrix::zeros(2, 5); // wrong column count
        assert!(ModelParams::new(w, b, z, 1.0).is_err());
    }

    #[test]
    fn test_sparse_round_trip() {
        let params = small_params();
        let sparse = SparseMatrix::from_dense(&params.w);
        assert_eq!(sparse.nnz(), 3);
        assert_eq!(sparse.to_dense(), params.w);
    }

    #[test]
    fn test_sparse_out_of_bounds_entry() {
        assert!(SparseMatrix::from_entries(2, 2, vec![(2, 0, 1.0)]).is_err());
        assert!(SparseMatrix::from_entries(2, 2, vec![(1, 1, 1.0)]).is_ok());
    }

    #[test]
    fn test_param_matrix_multiply_agrees_across_formats() {
        let params = small_params();
        let rhs = Matrix::from_vec(3, 1, vec![1.0, 1.0, 1.0]).unwrap();

        let dense = ParamMatrix::Dense(params.w.clone());
        let sparse = ParamMatrix::Sparse(SparseMatrix::from_dense(&params.w));

        let a = dense.multiply(&rhs).unwrap();
        let b = sparse.multiply(&rhs).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), (2, 1));
    }

    #[test]
    fn test_param_selection_respects_format() {
        let params = small_params().with_format(StorageFormat::Sparse);
        match params.param(Param::W) {
            ParamMatrix::Sparse(s) => assert_eq!(s.nnz(), 3),
            ParamMatrix::Dense(_) => panic!("expected sparse view"),
        }
        assert_eq!(params.param(Param::Z).n_cols(), 2);
    }
}
