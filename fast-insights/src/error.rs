//! Error types for the fast-insights library.
//!
//! Every fallible operation returns [`Result<T>`], an alias over the
//! [`InsightError`] enum. Errors are fail-fast: there is no retry path, and a
//! caller should treat any error as fatal to the current analysis step.
//! Recoverable oddities (a pruned column, an empty combination request) are
//! reported through `tracing` warnings instead.

use thiserror::Error;

/// The main error type for the fast-insights library.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Malformed constructor arguments or an invalid request.
    ///
    /// Covers overlapping column sets, a missing target, unknown binarization
    /// modes, an invalid quantile level, a non-{0,1} binary target and unknown
    /// segment names.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A declared numeric column holds a value that cannot be read as a number.
    #[error("Cannot convert value '{value}' in column '{column}' to a number")]
    TypeConversion {
        /// Column that failed conversion
        column: String,
        /// First offending raw value
        value: String,
    },

    /// An operation was invoked before the model reached the required state.
    #[error("Invalid model state: {0}")]
    State(String),

    /// Failure surfaced from the binning collaborator.
    #[error("Binning dependency error: {message}")]
    Dependency {
        /// Human-readable error message
        message: String,
        /// Underlying error reported by the collaborator
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required column is not present in the table.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, InsightError>`.
pub type Result<T> = std::result::Result<T, InsightError>;

impl InsightError {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Creates a new type conversion error.
    pub fn type_conversion(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::TypeConversion {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Creates a dependency error without an underlying source.
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error reported by the binning collaborator.
    pub fn dependency_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Dependency {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns `true` for errors caused by invalid caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::ColumnNotFound { .. })
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
