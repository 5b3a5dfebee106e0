//! TSV matrix parsing and rendering.
//!
//! Covers the predefined-model input files (header-free numeric grids named
//! W, Z, B, gamma) and the ASCII dumps the run recorder writes.

use crate::error::{PrototipoError, Result};
use crate::primitives::Matrix;
use std::fs;
use std::path::Path;

/// Parses a header-free tab/whitespace-separated numeric grid.
///
/// # Errors
///
/// Returns [`PrototipoError::FormatError`] on empty input, ragged rows, or
/// unparseable numbers.
pub fn parse_tsv(text: &str) -> Result<Matrix<f32>> {
    let mut rows: Vec<Vec<f32>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for token in line.split_whitespace() {
            let v: f32 = token.parse().map_err(|_| PrototipoError::FormatError {
                message: format!("line {}: not a number: {token:?}", line_no + 1),
            })?;
            row.push(v);
        }
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(PrototipoError::FormatError {
                    message: format!(
                        "line {}: expected {} columns, found {}",
                        line_no + 1,
                        first.len(),
                        row.len()
                    ),
                });
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(PrototipoError::FormatError {
            message: "empty matrix file".to_string(),
        });
    }
    let n_rows = rows.len();
    let n_cols = rows[0].len();
    let data: Vec<f32> = rows.into_iter().flatten().collect();
    Matrix::from_vec(n_rows, n_cols, data).map_err(PrototipoError::from)
}

/// Renders a matrix as a tab-separated grid, one row per line.
#[must_use]
pub fn render_tsv(m: &Matrix<f32>) -> String {
    let mut out = String::new();
    for row in 0..m.n_rows() {
        for col in 0..m.n_cols() {
            if col > 0 {
                out.push('\t');
            }
            out.push_str(&format!("{}", m.get(row, col)));
        }
        out.push('\n');
    }
    out
}

/// Reads and parses a TSV matrix file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or a format error if it
/// cannot be parsed.
pub fn read_tsv_matrix(path: &Path) -> Result<Matrix<f32>> {
    let text = fs::read_to_string(path)?;
    parse_tsv(&text)
}
