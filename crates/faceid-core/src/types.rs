use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported when no gallery record is close enough to the probe.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Face embedding vector (128-dimensional for Facenet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check that the embedding has exactly `dimension` finite values.
    pub fn validate(&self, dimension: usize) -> Result<(), ValidationError> {
        if self.values.len() != dimension {
            return Err(ValidationError::DimensionMismatch {
                expected: dimension,
                actual: self.values.len(),
            });
        }
        match self.values.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(ValidationError::NonFinite { index }),
            None => Ok(()),
        }
    }

    /// Compute Euclidean (L2) distance between two embeddings.
    ///
    /// Accumulates in `f64`, so the distance between finite embeddings is
    /// always finite. No normalization is applied; callers normalize upstream
    /// if their extractor requires it.
    pub fn euclidean_distance(&self, other: &Embedding) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Position of a record in the gallery. Stable because the gallery is append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered identity: one labeled embedding.
///
/// Several records may share a label (multiple photos of the same person).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub label: String,
    pub embedding: Embedding,
    /// Stored name of the source image, when registered from an upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl IdentityRecord {
    /// Build a record, rejecting blank labels and malformed embeddings.
    pub fn new(
        label: impl Into<String>,
        embedding: Embedding,
        dimension: usize,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            label: label.into(),
            embedding,
            filename: None,
        };
        record.validate(dimension)?;
        Ok(record)
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }

    pub fn validate(&self, dimension: usize) -> Result<(), ValidationError> {
        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel);
        }
        self.embedding.validate(dimension)
    }
}

/// Outcome of matching a probe embedding against a gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Label of the matched record, or [`UNKNOWN_LABEL`].
    pub label: String,
    /// Smallest distance found; `None` when the gallery was empty.
    pub distance: Option<f64>,
    /// Insertion index of the matched record (if any).
    pub matched_record: Option<RecordId>,
}

impl MatchResult {
    pub fn unknown(distance: Option<f64>) -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            distance,
            matched_record: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_record.is_some()
    }

    /// `1 - distance`, deliberately not clamped to [0, 1].
    ///
    /// Distances above 1 yield negative confidence.
    pub fn confidence(&self) -> Option<f64> {
        self.distance.map(|d| 1.0 - d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert_eq!(a.euclidean_distance(&b), 5.0);
        assert_eq!(b.euclidean_distance(&a), 5.0);
    }

    #[test]
    fn test_euclidean_distance_extreme_values_stay_finite() {
        let a = Embedding::new(vec![3.0e38, -3.0e38]);
        let b = Embedding::new(vec![-3.0e38, 3.0e38]);
        let dist = a.euclidean_distance(&b);
        assert!(dist.is_finite());
        assert!((dist / 8.485_281_374e38 - 1.0).abs() < 1e-6, "got {dist}");
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![0.25, -1.5, 3.0]);
        assert_eq!(a.euclidean_distance(&a.clone()), 0.0);
    }

    #[test]
    fn test_validate_dimension() {
        let e = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert!(e.validate(3).is_ok());
        assert_eq!(
            e.validate(2),
            Err(ValidationError::DimensionMismatch { expected: 2, actual: 3 })
        );
    }

    #[test]
    fn test_validate_non_finite() {
        let e = Embedding::new(vec![1.0, f32::NAN, 3.0]);
        assert_eq!(e.validate(3), Err(ValidationError::NonFinite { index: 1 }));
        let e = Embedding::new(vec![f32::INFINITY, 0.0, 0.0]);
        assert_eq!(e.validate(3), Err(ValidationError::NonFinite { index: 0 }));
    }

    #[test]
    fn test_record_rejects_blank_label() {
        let e = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(
            IdentityRecord::new("", e.clone(), 2),
            Err(ValidationError::EmptyLabel)
        );
        assert_eq!(
            IdentityRecord::new("   ", e, 2),
            Err(ValidationError::EmptyLabel)
        );
    }

    #[test]
    fn test_confidence_not_clamped() {
        let far = MatchResult::unknown(Some(14.0));
        assert_eq!(far.confidence(), Some(-13.0));
        let near = MatchResult::unknown(Some(0.25));
        assert_eq!(near.confidence(), Some(0.75));
        assert_eq!(MatchResult::unknown(None).confidence(), None);
    }

    #[test]
    fn test_record_serializes_flat_embedding() {
        let rec = IdentityRecord::new("alice", Embedding::new(vec![0.5, 1.0]), 2).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json, serde_json::json!({"label": "alice", "embedding": [0.5, 1.0]}));
    }

    #[test]
    fn test_record_filename_round_trip() {
        let rec = IdentityRecord::new("alice", Embedding::new(vec![0.5, 1.0]), 2)
            .unwrap()
            .with_filename(Some("alice_a.jpg".into()));
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains(r#""filename":"alice_a.jpg""#), "{json}");
        let back: IdentityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);

        let legacy: IdentityRecord =
            serde_json::from_str(r#"{"label": "bob", "embedding": [0, 1]}"#).unwrap();
        assert_eq!(legacy.filename, None);
    }
}
