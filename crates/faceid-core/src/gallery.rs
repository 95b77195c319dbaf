//! Append-only embedding gallery backed by an atomically replaced JSON snapshot.
//!
//! Writers (`register`) hold an exclusive lock across the in-memory append
//! and the snapshot write. Readers (`find_match`, `all_records`) take a shared
//! lock, so they see the gallery either before or after any registration.

use crate::error::{FaceIdError, PersistenceError, ValidationError};
use crate::matcher::{LinearScanMatcher, Matcher};
use crate::snapshot;
use crate::types::{Embedding, IdentityRecord, MatchResult, RecordId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dimension: usize,
    records: &'a [IdentityRecord],
}

#[derive(Deserialize)]
struct Snapshot {
    dimension: usize,
    records: Vec<IdentityRecord>,
}

pub struct EmbeddingGallery<M = LinearScanMatcher> {
    path: PathBuf,
    dimension: usize,
    records: RwLock<Vec<IdentityRecord>>,
    matcher: M,
}

impl EmbeddingGallery<LinearScanMatcher> {
    /// Load the gallery from `path`, matching with a linear scan.
    ///
    /// A missing or empty snapshot yields an empty gallery.
    pub fn load(path: impl Into<PathBuf>, dimension: usize) -> Result<Self, FaceIdError> {
        Self::load_with_matcher(path, dimension, LinearScanMatcher)
    }
}

impl<M: Matcher> EmbeddingGallery<M> {
    /// Load the gallery from `path` with a custom matching strategy.
    pub fn load_with_matcher(
        path: impl Into<PathBuf>,
        dimension: usize,
        matcher: M,
    ) -> Result<Self, FaceIdError> {
        if dimension == 0 {
            return Err(ValidationError::ZeroDimension.into());
        }
        let path = path.into();

        let records = match snapshot::read_json::<Snapshot>(&path)? {
            None => Vec::new(),
            Some(snap) => {
                if snap.dimension != dimension {
                    return Err(PersistenceError::DimensionMismatch {
                        path,
                        expected: dimension,
                        found: snap.dimension,
                    }
                    .into());
                }
                for (index, record) in snap.records.iter().enumerate() {
                    if let Err(source) = record.validate(dimension) {
                        return Err(PersistenceError::InvalidRecord {
                            path,
                            index,
                            source,
                        }
                        .into());
                    }
                }
                snap.records
            }
        };

        tracing::info!(
            path = %path.display(),
            dimension,
            records = records.len(),
            "gallery loaded"
        );

        Ok(Self {
            path,
            dimension,
            records: RwLock::new(records),
            matcher,
        })
    }

    /// Append a record and persist the gallery before returning.
    ///
    /// If the snapshot write fails the record is removed again, so memory and
    /// disk never diverge.
    pub fn register(
        &self,
        label: impl Into<String>,
        embedding: Embedding,
    ) -> Result<RecordId, FaceIdError> {
        self.register_with_filename(label, embedding, None)
    }

    /// Like [`register`](Self::register), also storing the source image name.
    pub fn register_with_filename(
        &self,
        label: impl Into<String>,
        embedding: Embedding,
        filename: Option<String>,
    ) -> Result<RecordId, FaceIdError> {
        let record = IdentityRecord::new(label, embedding, self.dimension)?.with_filename(filename);

        let mut records = self.records.write();
        let id = RecordId(records.len());
        records.push(record);

        if let Err(e) = self.persist(&records) {
            records.truncate(id.index());
            tracing::error!(path = %self.path.display(), error = %e, "gallery persist failed; registration rolled back");
            return Err(e.into());
        }

        tracing::info!(
            label = %records[id.index()].label,
            record = id.index(),
            total = records.len(),
            "identity registered"
        );
        Ok(id)
    }

    /// Match a probe against the current gallery contents.
    pub fn find_match(&self, probe: &Embedding, threshold: f32) -> Result<MatchResult, ValidationError> {
        probe.validate(self.dimension)?;
        let records = self.records.read();
        Ok(self.matcher.compare(probe, &records, threshold))
    }

    /// Copy of all records in insertion order.
    pub fn all_records(&self) -> Vec<IdentityRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[IdentityRecord]) -> Result<(), PersistenceError> {
        snapshot::write_json_atomic(
            &self.path,
            &SnapshotRef {
                dimension: self.dimension,
                records,
            },
        )
    }
}
