//! Prototipo: prototype-based nearest-neighbor classification for
//! resource-constrained devices, in pure Rust.
//!
//! Prototipo learns three small matrices jointly by alternating
//! minimization: a low-dimensional projection W, a set of prototypes B in
//! the projected space, and a prototype-to-label map Z. Prediction scores a
//! point by a Gaussian-kernel-weighted vote over the prototypes, so the
//! whole model is a few kilobytes of floats that fit on a microcontroller.
//!
//! # Quick Start
//!
//! ```
//! use prototipo::prelude::*;
//!
//! let mut hyper = HyperParams::new(2, 2)
//!     .with_projection_dim(2)
//!     .with_n_prototypes(2)
//!     .with_iters(2)
//!     .with_epochs(2)
//!     .with_batch_size(4);
//!
//! // Feed labeled points, one at a time.
//! let mut data = Dataset::streaming(2, 2);
//! for i in 0..12 {
//!     let v = if i % 2 == 0 { [1.0, 0.0] } else { [0.0, 1.0] };
//!     data.feed_dense(&v, &[i % 2]).unwrap();
//! }
//! data.finalize(&mut hyper).unwrap();
//!
//! // Train and inspect the learned statistics.
//! let mut session = TrainingSession::new(hyper).unwrap();
//! session.run(&mut data).unwrap();
//! let final_accuracy = session.stats().last().unwrap().train_accuracy;
//! assert!(final_accuracy >= 0.5);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Matrix and Vector types
//! - [`hyper`]: Hyperparameters and run configuration
//! - [`data`]: Training/test data store with bulk and streaming ingestion
//! - [`preprocessing`]: Feature normalization (L2, min-max)
//! - [`cluster`]: Seeded k-means++ used by initialization
//! - [`init`]: Model initialization strategies and the bandwidth heuristic
//! - [`model`]: Learned parameters and dense/sparse storage views
//! - [`train`]: The alternating-minimization training session
//! - [`export`]: Binary export of model matrices into exact-size buffers
//! - [`report`]: Per-run result directories and TSV model dumps
//! - [`io`]: TSV matrix parsing and rendering

pub mod cluster;
pub mod data;
pub mod error;
pub mod export;
pub mod hyper;
pub mod init;
pub mod io;
pub mod model;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod report;
pub mod train;
