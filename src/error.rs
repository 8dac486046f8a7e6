//! Library error type.
//!
//! Numerical divergence is deliberately absent here: callers observe
//! non-finite values and stop their own loops.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerseError {
    #[error("shape mismatch in {op}: {detail}")]
    ShapeMismatch { op: &'static str, detail: String },
    #[error("cofactor determinant limited to dimension {max}, got {dimension}")]
    DeterminantTooLarge { dimension: usize, max: usize },
    #[error("no tensor named '{0}' in parameter set")]
    UnknownTensor(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },
    #[error("render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, VerseError>;

impl VerseError {
    pub(crate) fn shape(op: &'static str, detail: impl Into<String>) -> Self {
        VerseError::ShapeMismatch {
            op,
            detail: detail.into(),
        }
    }
}
