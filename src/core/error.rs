use thiserror::Error;

use crate::column::ColumnType;

/// Error type definitions
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error")]
    Io(#[source] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("Inconsistent row count: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("Column type mismatch: column {name}, expected {expected:?}, found {found:?}")]
    ColumnTypeMismatch {
        name: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Dimension mismatch error: {0}")]
    DimensionMismatch(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Feature mismatch: expected {expected:?}, found {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Insufficient data error: {0}")]
    InsufficientData(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category reported by the analytics operations.
///
/// Data-layer and numerical variants collapse into [`ErrorKind::Analysis`], so
/// callers (and log events) can branch on a small stable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedModel,
    UnsupportedMethod,
    ModelNotFound,
    FeatureMismatch,
    DependencyUnavailable,
    InsufficientData,
    InvalidInput,
    Cancelled,
    Configuration,
    Analysis,
}

impl ErrorKind {
    /// Stable snake_case name used as the `error_kind` log value
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedModel => "unsupported_model",
            ErrorKind::UnsupportedMethod => "unsupported_method",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::FeatureMismatch => "feature_mismatch",
            ErrorKind::DependencyUnavailable => "dependency_unavailable",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Analysis => "analysis",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedModel(_) => ErrorKind::UnsupportedModel,
            Error::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            Error::ModelNotFound(_) => ErrorKind::ModelNotFound,
            Error::FeatureMismatch { .. } => ErrorKind::FeatureMismatch,
            Error::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            Error::InsufficientData(_) | Error::EmptyData(_) => ErrorKind::InsufficientData,
            Error::ColumnNotFound(_)
            | Error::ColumnTypeMismatch { .. }
            | Error::InvalidInput(_)
            | Error::InvalidValue(_) => ErrorKind::InvalidInput,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::ConfigurationError(_) => ErrorKind::Configuration,
            Error::Io(_)
            | Error::Serialization(_)
            | Error::DuplicateColumnName(_)
            | Error::InconsistentRowCount { .. }
            | Error::DimensionMismatch(_)
            | Error::Analysis(_) => ErrorKind::Analysis,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
