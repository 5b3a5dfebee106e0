//! Core compute primitives (Vector, Matrix).
//!
//! These types provide the foundation for the training loop. Feature and
//! label matrices follow the columns-as-samples convention.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
