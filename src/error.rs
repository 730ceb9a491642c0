use serde::Serialize;
use thiserror::Error;

/// Every way a scoring call can fail.
///
/// `Decode` and `UnsupportedFormat` are per-image ("bad input") failures and
/// are reported inside a `BatchResult`.  `ModelNotLoaded` aborts the whole call
/// and is the one retryable condition.  `Inference` can be either per-image or
/// per-chunk, depending on where the network gave up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("scoring cancelled")]
    Cancelled,

    #[error("could not load model: {0}")]
    ModelLoad(String),
}

/// Machine-readable tag for a `ScoreError`, serialized into API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "decode_error")]
    Decode,
    #[serde(rename = "unsupported_format")]
    UnsupportedFormat,
    #[serde(rename = "model_not_loaded")]
    ModelNotLoaded,
    #[serde(rename = "inference_error")]
    Inference,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "model_load_error")]
    ModelLoad,
}

impl ScoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::Decode(_) => ErrorKind::Decode,
            ScoreError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ScoreError::ModelNotLoaded => ErrorKind::ModelNotLoaded,
            ScoreError::Inference(_) => ErrorKind::Inference,
            ScoreError::Cancelled => ErrorKind::Cancelled,
            ScoreError::ModelLoad(_) => ErrorKind::ModelLoad,
        }
    }

    /// True when the caller sent something we cannot score, as opposed to the
    /// service being unable to score it.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, ScoreError::Decode(_) | ScoreError::UnsupportedFormat(_))
    }

    /// True when the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScoreError::ModelNotLoaded)
    }
}
