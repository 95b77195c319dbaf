use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before it could touch the gallery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("label must not be empty")]
    EmptyLabel,
    #[error("expected {expected}-dim embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding value at index {index} is not finite")]
    NonFinite { index: usize },
    #[error("embedding dimension must be non-zero")]
    ZeroDimension,
}

/// The upstream embedder could not produce an embedding.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no face detected")]
    NoFaceDetected,
    #[error("embedding extraction failed: {0}")]
    Failed(String),
}

/// Durable state could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("snapshot {path} holds {found}-dim embeddings, configured for {expected}")]
    DimensionMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("snapshot {path} has an invalid record at {index}: {source}")]
    InvalidRecord {
        path: PathBuf,
        index: usize,
        #[source]
        source: ValidationError,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Umbrella error for gallery, matcher and history operations.
#[derive(Error, Debug)]
pub enum FaceIdError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
