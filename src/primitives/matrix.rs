//! Matrix type for 2D numeric data.

use super::Vector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// Feature matrices in this crate are D x N with columns as samples; label
/// matrices are L x N.
///
/// # Examples
///
/// ```
/// use prototipo::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, &'static str> {
        if data.len() != rows * cols {
            return Err("Data length must equal rows * cols");
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        let start = row_idx * self.cols;
        let end = start + self.cols;
        Vector::from_slice(&self.data[start..end])
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Overwrites a column from a slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice length doesn't equal the row count or the column
    /// index is out of bounds.
    pub fn set_column(&mut self, col_idx: usize, values: &[T]) {
        assert_eq!(values.len(), self.rows, "set_column: length mismatch");
        for (row, &v) in values.iter().enumerate() {
            self.data[row * self.cols + col_idx] = v;
        }
    }

    /// Gathers a subset of columns into a new matrix, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn columns(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in 0..self.rows {
            for &c in indices {
                data.push(self.data[row * self.cols + c]);
            }
        }
        Self {
            data,
            rows: self.rows,
            cols: indices.len(),
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl Matrix<f32> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Transposes the matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix-matrix multiplication, parallelized over output rows.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matmul(&self, other: &Self) -> Result<Self, &'static str> {
        if self.cols != other.rows {
            return Err("Matrix dimensions don't match for multiplication");
        }

        let n = other.cols;
        let mut result = vec![0.0f32; self.rows * n];
        result
            .par_chunks_mut(n.max(1))
            .enumerate()
            .for_each(|(i, out)| {
                for k in 0..self.cols {
                    let a = self.data[i * self.cols + k];
                    if a != 0.0 {
                        let base = k * n;
                        for (j, o) in out.iter_mut().enumerate() {
                            *o += a * other.data[base + j];
                        }
                    }
                }
            });

        Ok(Self {
            data: result,
            rows: self.rows,
            cols: n,
        })
    }

    /// Subtracts another matrix element-wise.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn sub(&self, other: &Self) -> Result<Self, &'static str> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err("Matrix dimensions must match for subtraction");
        }

        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();

        Ok(Self {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Multiplies each element by a scalar.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f32) -> Self {
        Self {
            data: self.data.iter().map(|x| x * scalar).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// In-place `self += other * scalar`.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn add_scaled(&mut self, other: &Self, scalar: f32) -> Result<(), &'static str> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err("Matrix dimensions must match for add_scaled");
        }
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b * scalar;
        }
        Ok(())
    }

    /// Element-wise product with another matrix of the same shape.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn hadamard(&self, other: &Self) -> Result<Self, &'static str> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err("Matrix dimensions must match for hadamard");
        }
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .collect();
        Ok(Self {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Sum of each row (length = rows).
    #[must_use]
    pub fn row_sums(&self) -> Vec<f32> {
        self.data
            .chunks(self.cols.max(1))
            .map(|r| r.iter().sum())
            .collect()
    }

    /// Sum of each column (length = cols).
    #[must_use]
    pub fn col_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.cols];
        for row in self.data.chunks(self.cols.max(1)) {
            for (s, v) in sums.iter_mut().zip(row.iter()) {
                *s += v;
            }
        }
        sums
    }

    /// Scales column `col_idx` by `factor` in place.
    pub fn scale_column(&mut self, col_idx: usize, factor: f32) {
        for row in 0..self.rows {
            self.data[row * self.cols + col_idx] *= factor;
        }
    }

    /// Frobenius norm.
    #[must_use]
    pub fn frobenius_norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Number of nonzero entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&x| x != 0.0).count()
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
