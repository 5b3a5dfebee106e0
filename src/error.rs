//! Error types for Prototipo operations.
//!
//! Every fatal condition of a training run (bad hyperparameters, ingestion
//! mismatches, export contract violations) is surfaced as a value of
//! [`PrototipoError`] rather than aborting the process.

use std::fmt;

/// Main error type for Prototipo operations.
///
/// # Examples
///
/// ```
/// use prototipo::error::PrototipoError;
///
/// let err = PrototipoError::DimensionMismatch {
///     expected: "5x20".to_string(),
///     actual: "5x19".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug)]
pub enum PrototipoError {
    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Declared sample counts disagree with the data actually fed.
    IngestMismatch {
        /// What was being counted (e.g. "training samples")
        what: String,
        /// Count declared in the hyperparameters
        declared: usize,
        /// Count observed at finalize time
        observed: usize,
    },

    /// Caller-provided export buffer size disagrees with the queried size.
    ExportContract {
        /// Size returned by the size query
        expected: usize,
        /// Size of the buffer actually provided
        actual: usize,
    },

    /// Combined model size exceeds the interface-ingestion protocol limit.
    ModelTooLarge {
        /// Computed model size in bytes
        size: usize,
        /// Protocol limit in bytes
        limit: usize,
    },

    /// Invalid or corrupt model file.
    FormatError {
        /// Error description
        message: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for PrototipoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrototipoError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Matrix dimension mismatch: expected {expected}, got {actual}"
                )
            }
            PrototipoError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            PrototipoError::IngestMismatch {
                what,
                declared,
                observed,
            } => {
                write!(
                    f,
                    "Ingestion mismatch for {what}: declared {declared}, observed {observed}"
                )
            }
            PrototipoError::ExportContract { expected, actual } => {
                write!(
                    f,
                    "Export buffer contract violated: queried size {expected}, buffer has {actual}"
                )
            }
            PrototipoError::ModelTooLarge { size, limit } => {
                write!(f, "Model size {size} bytes exceeds protocol limit {limit}")
            }
            PrototipoError::FormatError { message } => {
                write!(f, "Invalid model format: {message}")
            }
            PrototipoError::Io(e) => write!(f, "I/O error: {e}"),
            PrototipoError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PrototipoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrototipoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PrototipoError {
    fn from(err: std::io::Error) -> Self {
        PrototipoError::Io(err)
    }
}

impl From<&str> for PrototipoError {
    fn from(msg: &str) -> Self {
        PrototipoError::Other(msg.to_string())
    }
}

impl From<String> for PrototipoError {
    fn from(msg: String) -> Self {
        PrototipoError::Other(msg)
    }
}

impl PrototipoError {
    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an invalid hyperparameter error.
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, PrototipoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = PrototipoError::DimensionMismatch {
            expected: "5x20".to_string(),
            actual: "5x19".to_string(),
        };
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(err.to_string().contains("5x20"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = PrototipoError::invalid_hyperparameter("n_prototypes", 0, ">0");
        assert!(err.to_string().contains("Invalid hyperparameter"));
        assert!(err.to_string().contains("n_prototypes"));
        assert!(err.to_string().contains(">0"));
    }

    #[test]
    fn test_ingest_mismatch_display() {
        let err = PrototipoError::IngestMismatch {
            what: "training samples".to_string(),
            declared: 100,
            observed: 99,
        };
        let msg = err.to_string();
        assert!(msg.contains("training samples"));
        assert!(msg.contains("100"));
        assert!(msg.contains("99"));
    }

    #[test]
    fn test_export_contract_display() {
        let err = PrototipoError::ExportContract {
            expected: 128,
            actual: 127,
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("127"));
    }

    #[test]
    fn test_model_too_large_display() {
        let err = PrototipoError::ModelTooLarge {
            size: 1 << 32,
            limit: 1 << 31,
        };
        assert!(err.to_string().contains("exceeds protocol limit"));
    }

    #[test]
    fn test_from_str() {
        let err: PrototipoError = "test error".into();
        assert!(matches!(err, PrototipoError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PrototipoError = io_err.into();
        assert!(matches!(err, PrototipoError::Io(_)));
        use std::error::Error;
        assert!(err.source().is_some());
    }
}
