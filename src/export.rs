//! Binary export of learned model matrices into caller-provided buffers.
//!
//! The contract is two-phase: the caller first queries the exact byte size,
//! then hands over a buffer of precisely that length to be filled. A buffer
//! of any other length is rejected outright; nothing is ever truncated.
//!
//! Layouts (all little-endian):
//!
//! - Dense: `u32 rows, u32 cols`, then `rows * cols` `f32` values row-major.
//! - Sparse: `u32 rows, u32 cols, u64 nnz`, then `nnz` triplets of
//!   `(u32 row, u32 col, f32 value)` in row-major order.

use crate::error::{PrototipoError, Result};
use crate::model::{ModelParams, Param, ParamMatrix, SparseMatrix};
use crate::primitives::Matrix;

/// Wire density of one exported matrix, chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Header plus every entry.
    Dense,
    /// Header plus (row, col, value) triplets for nonzeros only.
    Sparse,
}

const DENSE_HEADER: usize = 8;
const SPARSE_HEADER: usize = 16;
const SPARSE_ENTRY: usize = 12;

/// Hard ceiling on the total model size when exporting for interface
/// ingestion on-device.
pub const INTERFACE_MODEL_LIMIT: usize = 1 << 31;

/// Byte size of a matrix in dense wire layout.
#[must_use]
pub fn dense_size(rows: usize, cols: usize) -> usize {
    DENSE_HEADER + 4 * rows * cols
}

/// Byte size of a matrix in sparse wire layout.
#[must_use]
pub fn sparse_size(nnz: usize) -> usize {
    SPARSE_HEADER + SPARSE_ENTRY * nnz
}

/// Serializes a dense matrix into `buf`.
///
/// # Errors
///
/// Returns [`PrototipoError::ExportContract`] unless `buf.len()` equals
/// [`dense_size`] exactly.
pub fn export_dense(m: &Matrix<f32>, buf: &mut [u8]) -> Result<()> {
    let expected = dense_size(m.n_rows(), m.n_cols());
    if buf.len() != expected {
        return Err(PrototipoError::ExportContract {
            expected,
            actual: buf.len(),
        });
    }
    buf[0..4].copy_from_slice(&(m.n_rows() as u32).to_le_bytes());
    buf[4..8].copy_from_slice(&(m.n_cols() as u32).to_le_bytes());
    for (i, &v) in m.as_slice().iter().enumerate() {
        let at = DENSE_HEADER + 4 * i;
        buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
    Ok(())
}

/// Serializes a sparse matrix into `buf`.
///
/// # Errors
///
/// Returns [`PrototipoError::ExportContract`] unless `buf.len()` equals
/// [`sparse_size`] exactly.
pub fn export_sparse(s: &SparseMatrix, buf: &mut [u8]) -> Result<()> {
    let expected = sparse_size(s.nnz());
    if buf.len() != expected {
        return Err(PrototipoError::ExportContract {
            expected,
            actual: buf.len(),
        });
    }
    buf[0..4].copy_from_slice(&(s.n_rows() as u32).to_le_bytes());
    buf[4..8].copy_from_slice(&(s.n_cols() as u32).to_le_bytes());
    buf[8..16].copy_from_slice(&(s.nnz() as u64).to_le_bytes());
    for (i, &(r, c, v)) in s.entries().iter().enumerate() {
        let at = SPARSE_HEADER + SPARSE_ENTRY * i;
        buf[at..at + 4].copy_from_slice(&r.to_le_bytes());
        buf[at + 4..at + 8].copy_from_slice(&c.to_le_bytes());
        buf[at + 8..at + 12].copy_from_slice(&v.to_le_bytes());
    }
    Ok(())
}

/// Parses a dense wire-layout buffer back into a matrix.
///
/// # Errors
///
/// Returns a format error if the buffer is shorter than its header claims or
/// carries trailing bytes.
pub fn import_dense(buf: &[u8]) -> Result<Matrix<f32>> {
    if buf.len() < DENSE_HEADER {
        return Err(PrototipoError::FormatError {
            message: "dense buffer shorter than header".to_string(),
        });
    }
    let rows = read_u32(buf, 0) as usize;
    let cols = read_u32(buf, 4) as usize;
    let expected = dense_size(rows, cols);
    if buf.len() != expected {
        return Err(PrototipoError::FormatError {
            message: format!("dense buffer is {} bytes, header implies {expected}", buf.len()),
        });
    }
    let mut data = Vec::with_capacity(rows * cols);
    for i in 0..rows * cols {
        data.push(read_f32(buf, DENSE_HEADER + 4 * i));
    }
    Matrix::from_vec(rows, cols, data).map_err(PrototipoError::from)
}

/// Parses a sparse wire-layout buffer back into a sparse matrix.
///
/// # Errors
///
/// Returns a format error on truncated buffers, trailing bytes, or
/// out-of-bounds triplets.
pub fn import_sparse(buf: &[u8]) -> Result<SparseMatrix> {
    if buf.len() < SPARSE_HEADER {
        return Err(PrototipoError::FormatError {
            message: "sparse buffer shorter than header".to_string(),
        });
    }
    let rows = read_u32(buf, 0);
    let cols = read_u32(buf, 4);
    let nnz = u64::from_le_bytes(
        buf[8..16]
            .try_into()
            .map_err(|_| PrototipoError::FormatError {
                message: "sparse header truncated".to_string(),
            })?,
    ) as usize;
    let expected = sparse_size(nnz);
    if buf.len() != expected {
        return Err(PrototipoError::FormatError {
            message: format!(
                "sparse buffer is {} bytes, header implies {expected}",
                buf.len()
            ),
        });
    }
    let mut entries = Vec::with_capacity(nnz);
    for i in 0..nnz {
        let at = SPARSE_HEADER + SPARSE_ENTRY * i;
        entries.push((read_u32(buf, at), read_u32(buf, at + 4), read_f32(buf, at + 8)));
    }
    SparseMatrix::from_entries(rows, cols, entries)
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_f32(buf: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Exports model matrices one at a time through the two-phase size/fill
/// contract.
///
/// # Examples
///
/// ```
/// use prototipo::export::{ExportFormat, ModelExporter};
/// use prototipo::model::{ModelParams, Param};
/// use prototipo::primitives::Matrix;
///
/// let params = ModelParams::new(
///     Matrix::zeros(2, 4),
///     Matrix::zeros(2, 3),
///     Matrix::zeros(2, 3),
///     1.0,
/// ).unwrap();
/// let exporter = ModelExporter::new(&params);
///
/// let size = exporter.size_for(Param::W, ExportFormat::Dense);
/// let mut buf = vec![0u8; size];
/// exporter.export(Param::W, ExportFormat::Dense, &mut buf).unwrap();
/// ```
#[derive(Debug)]
pub struct ModelExporter<'a> {
    params: &'a ModelParams,
    interface_ingest: bool,
}

impl<'a> ModelExporter<'a> {
    /// Creates an exporter over finished model parameters.
    #[must_use]
    pub fn new(params: &'a ModelParams) -> Self {
        Self {
            params,
            interface_ingest: false,
        }
    }

    /// Marks the export as destined for on-device interface ingestion,
    /// enabling the total-size ceiling.
    #[must_use]
    pub fn with_interface_ingest(mut self, on: bool) -> Self {
        self.interface_ingest = on;
        self
    }

    /// Exact byte size of one matrix in the requested wire format.
    #[must_use]
    pub fn size_for(&self, which: Param, format: ExportFormat) -> usize {
        let view = self.params.param(which);
        match format {
            ExportFormat::Dense => dense_size(view.n_rows(), view.n_cols()),
            ExportFormat::Sparse => sparse_size(view.to_sparse().nnz()),
        }
    }

    /// Fills `buf` with one matrix in the requested wire format.
    ///
    /// # Errors
    ///
    /// Returns [`PrototipoError::ExportContract`] if `buf.len()` differs from
    /// [`ModelExporter::size_for`], or [`PrototipoError::ModelTooLarge`] if
    /// interface ingestion is enabled and the whole model exceeds the
    /// on-device ceiling.
    pub fn export(&self, which: Param, format: ExportFormat, buf: &mut [u8]) -> Result<()> {
        if self.interface_ingest {
            let size = self.model_size();
            if size >= INTERFACE_MODEL_LIMIT {
                return Err(PrototipoError::ModelTooLarge {
                    size,
                    limit: INTERFACE_MODEL_LIMIT,
                });
            }
        }
        match format {
            ExportFormat::Dense => export_dense(&self.params.param(which).to_dense(), buf),
            ExportFormat::Sparse => export_sparse(&self.params.param(which).to_sparse(), buf),
        }
    }

    /// Total serialized model size: W, B and Z in the model's storage format
    /// plus four bytes for gamma.
    #[must_use]
    pub fn model_size(&self) -> usize {
        let per_param = |which| {
            let view = self.params.param(which);
            match view {
                ParamMatrix::Dense(m) => dense_size(m.n_rows(), m.n_cols()),
                ParamMatrix::Sparse(s) => sparse_size(s.nnz()),
            }
        };
        per_param(Param::W) + per_param(Param::B) + per_param(Param::Z) + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StorageFormat;

    fn sample_params() -> ModelParams {
        let w = Matrix::from_vec(2, 3, vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0]).unwrap();
        let b = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let z = Matrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        ModelParams::new(w, b, z, 0.5).unwrap()
    }

    #[test]
    fn test_dense_round_trip() {
        let params = sample_params();
        let exporter = ModelExporter::new(&params);

        let size = exporter.size_for(Param::W, ExportFormat::Dense);
        assert_eq!(size, 8 + 4 * 6);
        let mut buf = vec![0u8; size];
        exporter.export(Param::W, ExportFormat::Dense, &mut buf).unwrap();

        let back = import_dense(&buf).unwrap();
        assert_eq!(back, params.w);
    }

    #[test]
    fn test_sparse_round_trip_preserves_pattern() {
        let params = sample_params();
        let exporter = ModelExporter::new(&params);

        let size = exporter.size_for(Param::W, ExportFormat::Sparse);
        assert_eq!(size, 16 + 12 * 3);
        let mut buf = vec![0u8; size];
        exporter.export(Param::W, ExportFormat::Sparse, &mut buf).unwrap();

        let back = import_sparse(&buf).unwrap();
        assert_eq!(back.nnz(), 3);
        assert_eq!(back.to_dense(), params.w);
    }

    #[test]
    fn test_one_byte_short_buffer_rejected() {
        let params = sample_params();
        let exporter = ModelExporter::new(&params);

        let size = exporter.size_for(Param::B, ExportFormat::Dense);
        let mut buf = vec![0u8; size - 1];
        let err = exporter
            .export(Param::B, ExportFormat::Dense, &mut buf)
            .unwrap_err();
        assert!(matches!(err, PrototipoError::ExportContract { .. }));

        // Oversized buffers are rejected too, never partially filled.
        let mut buf = vec![0u8; size + 1];
        assert!(exporter
            .export(Param::B, ExportFormat::Dense, &mut buf)
            .is_err());
    }

    #[test]
    fn test_import_rejects_inconsistent_header() {
        let params = sample_params();
        let exporter = ModelExporter::new(&params);
        let size = exporter.size_for(Param::Z, ExportFormat::Dense);
        let mut buf = vec![0u8; size];
        exporter.export(Param::Z, ExportFormat::Dense, &mut buf).unwrap();

        buf.truncate(size - 4);
        assert!(import_dense(&buf).is_err());
        assert!(import_dense(&buf[..4]).is_err());
    }

    #[test]
    fn test_model_size_follows_storage_format() {
        let dense = sample_params();
        let dense_total = ModelExporter::new(&dense).model_size();
        // W 2x3, B 2x2, Z 2x2 dense, plus gamma.
        assert_eq!(dense_total, (8 + 24) + (8 + 16) + (8 + 16) + 4);

        let sparse = sample_params().with_format(StorageFormat::Sparse);
        let sparse_total = ModelExporter::new(&sparse).model_size();
        // W has 3 nonzeros, B and Z have 4 and 2.
        assert_eq!(sparse_total, (16 + 36) + (16 + 48) + (16 + 24) + 4);
    }

    #[test]
    fn test_interface_ingest_allows_small_models() {
        let params = sample_params();
        let exporter = ModelExporter::new(&params).with_interface_ingest(true);
        let size = exporter.size_for(Param::W, ExportFormat::Dense);
        let mut buf = vec![0u8; size];
        assert!(exporter.export(Param::W, ExportFormat::Dense, &mut buf).is_ok());
    }

    #[test]
    fn test_sparse_import_rejects_out_of_bounds_entry() {
        let mut buf = vec![0u8; sparse_size(1)];
        buf[0..4].copy_from_slice(&2u32.to_le_bytes());
        buf[4..8].copy_from_slice(&2u32.to_le_bytes());
        buf[8..16].copy_from_slice(&1u64.to_le_bytes());
        buf[16..20].copy_from_slice(&5u32.to_le_bytes()); // row out of bounds
        buf[20..24].copy_from_slice(&0u32.to_le_bytes());
        buf[24..28].copy_from_slice(&1.0f32.to_le_bytes());
        assert!(import_sparse(&buf).is_err());
    }
}
