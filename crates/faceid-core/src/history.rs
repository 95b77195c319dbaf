//! Recognition history: every recognition outcome, persisted as a JSON list.

use crate::error::{FaceIdError, PersistenceError};
use crate::snapshot;
use crate::types::MatchResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recognition source tag attached to every history entry.
///
/// Always "Cloud", even though matching runs locally.
pub const RECOGNITION_TYPE: &str = "Cloud";

/// One recognition outcome as written to the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub distance: Option<f64>,
    /// `1 - distance`, unclamped.
    pub confidence: Option<f64>,
    pub recognition_type: String,
    pub recognized_at: DateTime<Utc>,
}

impl RecognitionEntry {
    pub fn from_match(result: &MatchResult, filename: Option<String>) -> Self {
        Self {
            label: result.label.clone(),
            filename,
            distance: result.distance,
            confidence: result.confidence(),
            recognition_type: RECOGNITION_TYPE.to_string(),
            recognized_at: Utc::now(),
        }
    }
}

pub struct RecognitionHistory {
    path: PathBuf,
    entries: Mutex<Vec<RecognitionEntry>>,
}

impl RecognitionHistory {
    /// Load history from `path`. Missing or empty files start an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FaceIdError> {
        let path = path.into();
        let entries = snapshot::read_json::<Vec<RecognitionEntry>>(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), entries = entries.len(), "recognition history loaded");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Append an entry and persist. The entry is dropped again if the write fails.
    pub fn append(&self, entry: RecognitionEntry) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock();
        entries.push(entry);
        if let Err(e) = snapshot::write_json_atomic(&self.path, &*entries) {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<RecognitionEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
