//! faceid-core — Face embedding gallery and nearest-identity matching.
//!
//! Holds registered (label, embedding) records in an append-only gallery
//! persisted as an atomically replaced JSON snapshot, and matches probe
//! embeddings against it by Euclidean distance.

pub mod audit;
pub mod embedder;
pub mod error;
pub mod gallery;
pub mod history;
pub mod matcher;
pub mod snapshot;
pub mod types;

pub use image;

pub use audit::{AuditEvent, AuditLog};
pub use embedder::{decode_image, embed_bytes, Embedder};
pub use error::{ExtractionError, FaceIdError, PersistenceError, ValidationError};
pub use gallery::EmbeddingGallery;
pub use history::{RecognitionEntry, RecognitionHistory, RECOGNITION_TYPE};
pub use matcher::{LinearScanMatcher, Matcher};
pub use types::{Embedding, IdentityRecord, MatchResult, RecordId, UNKNOWN_LABEL};
