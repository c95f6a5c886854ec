use thiserror::Error;

/// Error taxonomy for the case intelligence pipeline.
///
/// Callers on the query surface must be able to tell "no results" apart
/// from "system not ready", so readiness and training failures are typed
/// rather than collapsed into empty result sets.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("vector index not ready: build or load it before querying")]
    NotReady,

    #[error("outcome classifier has no trained model")]
    NotTrained,

    #[error("training corpus too small: have {have} documents, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
