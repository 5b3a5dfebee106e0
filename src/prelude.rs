//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use prototipo::prelude::*;
//! ```

pub use crate::data::Dataset;
pub use crate::error::{PrototipoError, Result};
pub use crate::export::{ExportFormat, ModelExporter};
pub use crate::hyper::{HyperParams, InitializationType, NormalizationType};
pub use crate::model::{ModelParams, Param, StorageFormat};
pub use crate::primitives::{Matrix, Vector};
pub use crate::report::RunRecorder;
pub use crate::train::{StatsTriple, TrainingSession};
