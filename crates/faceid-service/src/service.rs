//! Registration and recognition flows over the gallery, history and audit log.

use crate::config::Config;
use faceid_core::{
    AuditEvent, AuditLog, Embedding, EmbeddingGallery, FaceIdError, IdentityRecord, MatchResult,
    RecognitionEntry, RecognitionHistory, RecordId, RECOGNITION_TYPE,
};

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub record: RecordId,
    pub label: String,
    /// Stored name for the uploaded file (`<label>_<original name>`).
    pub filename: Option<String>,
}

/// Outcome of a recognition, as returned to the caller and kept in history.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub result: MatchResult,
    pub entry: RecognitionEntry,
}

/// Shared state behind every request: one gallery, one history, one audit log.
pub struct FaceService {
    gallery: EmbeddingGallery,
    history: RecognitionHistory,
    audit: AuditLog,
    threshold: f32,
}

impl FaceService {
    pub fn open(config: &Config) -> Result<Self, FaceIdError> {
        let gallery = EmbeddingGallery::load(&config.gallery_path, config.embedding_dim)?;
        let history = RecognitionHistory::load(&config.history_path)?;
        let audit = AuditLog::new(&config.audit_log_path);
        tracing::info!(
            records = gallery.len(),
            history = history.len(),
            threshold = config.match_threshold,
            "face service opened"
        );
        Ok(Self::new(gallery, history, audit, config.match_threshold))
    }

    pub fn new(
        gallery: EmbeddingGallery,
        history: RecognitionHistory,
        audit: AuditLog,
        threshold: f32,
    ) -> Self {
        Self {
            gallery,
            history,
            audit,
            threshold,
        }
    }

    /// Register `embedding` under `label`. `source` is the uploaded file name.
    pub fn register(
        &self,
        label: &str,
        embedding: Embedding,
        source: Option<&str>,
    ) -> Result<Registration, FaceIdError> {
        let filename = source.map(|s| stored_filename(label, s));
        let record = self
            .gallery
            .register_with_filename(label, embedding, filename.clone())?;

        let mut event = AuditEvent::new("register").user(label);
        if let Some(f) = filename.as_deref() {
            event = event.filename(f);
        }
        self.audit_best_effort(&event);

        Ok(Registration {
            record,
            label: label.to_string(),
            filename,
        })
    }

    /// Match with the configured threshold and record the outcome.
    pub fn recognize(
        &self,
        probe: &Embedding,
        source: Option<&str>,
    ) -> Result<Recognition, FaceIdError> {
        self.recognize_with_threshold(probe, self.threshold, source)
    }

    /// Match with an explicit threshold and record the outcome.
    pub fn recognize_with_threshold(
        &self,
        probe: &Embedding,
        threshold: f32,
        source: Option<&str>,
    ) -> Result<Recognition, FaceIdError> {
        let result = self.gallery.find_match(probe, threshold)?;
        let filename = source.map(|s| stored_filename(&result.label, s));
        let entry = RecognitionEntry::from_match(&result, filename);
        self.history.append(entry.clone())?;

        tracing::info!(
            label = %result.label,
            matched = result.is_match(),
            distance = ?result.distance,
            "recognition complete"
        );

        let mut event = AuditEvent::new("recognize")
            .user(&result.label)
            .recognition_type(RECOGNITION_TYPE)
            .confidence(result.confidence());
        if let Some(f) = entry.filename.as_deref() {
            event = event.filename(f);
        }
        self.audit_best_effort(&event);

        Ok(Recognition { result, entry })
    }

    /// All registered records in insertion order.
    pub fn registered(&self) -> Vec<IdentityRecord> {
        self.gallery.all_records()
    }

    /// Full recognition history, oldest first.
    pub fn recognized(&self) -> Vec<RecognitionEntry> {
        self.history.entries()
    }

    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dimension": self.gallery.dimension(),
            "records": self.gallery.len(),
            "recognitions": self.history.len(),
            "threshold": self.threshold,
            "gallery_path": self.gallery.path().display().to_string(),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Audit failures are logged, never propagated: the gallery write has
    /// already committed by the time the audit line is written.
    fn audit_best_effort(&self, event: &AuditEvent<'_>) {
        if let Err(e) = self.audit.record(event) {
            tracing::warn!(error = %e, action = event.action, "audit log write failed");
        }
    }
}

/// Name under which an uploaded file is kept: `<label>_<original name>`.
pub fn stored_filename(label: &str, original: &str) -> String {
    format!("{label}_{original}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceid_core::{ValidationError, UNKNOWN_LABEL};
    use std::path::Path;

    fn config(dir: &Path, dim: usize, threshold: f32) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            gallery_path: dir.join("registered.json"),
            history_path: dir.join("recognized.json"),
            audit_log_path: dir.join("audit.log"),
            embedding_dim: dim,
            match_threshold: threshold,
        }
    }

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_register_then_recognize() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2, 5.0);
        let service = FaceService::open(&cfg).unwrap();

        let reg = service.register("alice", emb(&[0.0, 0.0]), Some("a.jpg")).unwrap();
        assert_eq!(reg.record, RecordId(0));
        assert_eq!(reg.filename.as_deref(), Some("alice_a.jpg"));
        service.register("bob", emb(&[10.0, 10.0]), None).unwrap();

        let rec = service.recognize(&emb(&[1.0, 1.0]), Some("probe.jpg")).unwrap();
        assert_eq!(rec.result.label, "alice");
        assert_eq!(rec.entry.filename.as_deref(), Some("alice_probe.jpg"));
        assert_eq!(rec.entry.recognition_type, "Cloud");

        let miss = service.recognize(&emb(&[20.0, 20.0]), Some("probe.jpg")).unwrap();
        assert_eq!(miss.result.label, UNKNOWN_LABEL);
        assert_eq!(miss.entry.filename.as_deref(), Some("unknown_probe.jpg"));
        assert!(miss.entry.confidence.unwrap() < -13.0);

        assert_eq!(service.recognized().len(), 2);

        let audit = std::fs::read_to_string(&cfg.audit_log_path).unwrap();
        let lines: Vec<_> = audit.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("Action: register, User: alice, File: alice_a.jpg"));
        assert!(lines[1].ends_with("Action: register, User: bob"));
        assert!(lines[2].contains("Action: recognize, User: alice, File: alice_probe.jpg, Type: Cloud, Confidence: "));
        assert!(lines[3].contains("User: unknown"));
    }

    #[test]
    fn test_registered_lists_stored_filename() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2, 0.3);
        let service = FaceService::open(&cfg).unwrap();
        service.register("alice", emb(&[0.0, 0.0]), Some("a.jpg")).unwrap();
        service.register("bob", emb(&[1.0, 1.0]), None).unwrap();

        let records = FaceService::open(&cfg).unwrap().registered();
        assert_eq!(records[0].filename.as_deref(), Some("alice_a.jpg"));
        assert_eq!(records[1].filename, None);
    }

    #[test]
    fn test_audit_failure_does_not_fail_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 2, 5.0);
        // A directory cannot be opened for appending.
        cfg.audit_log_path = dir.path().to_path_buf();
        let service = FaceService::open(&cfg).unwrap();

        let reg = service.register("alice", emb(&[0.0, 0.0]), Some("a.jpg")).unwrap();
        assert_eq!(reg.record, RecordId(0));
        let rec = service.recognize(&emb(&[1.0, 1.0]), None).unwrap();
        assert_eq!(rec.result.label, "alice");

        let reopened = FaceService::open(&cfg).unwrap();
        assert_eq!(reopened.registered().len(), 1);
        assert_eq!(reopened.recognized().len(), 1);
        assert_eq!(reopened.recognized()[0].label, "alice");
    }

    #[test]
    fn test_extreme_embedding_history_keeps_distance() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2, 0.3);
        let service = FaceService::open(&cfg).unwrap();
        service.register("far", emb(&[3.0e38, -3.0e38]), None).unwrap();
        let rec = service.recognize(&emb(&[-3.0e38, 3.0e38]), None).unwrap();
        let distance = rec.result.distance.unwrap();
        assert!(distance.is_finite());

        let reloaded = FaceService::open(&cfg).unwrap().recognized();
        assert_eq!(reloaded[0].distance, Some(distance));
        assert_eq!(reloaded[0].confidence, rec.entry.confidence);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2, 0.3);
        {
            let service = FaceService::open(&cfg).unwrap();
            service.register("alice", emb(&[0.1, 0.1]), None).unwrap();
            service.recognize(&emb(&[0.1, 0.1]), None).unwrap();
        }
        let service = FaceService::open(&cfg).unwrap();
        assert_eq!(service.registered().len(), 1);
        assert_eq!(service.registered()[0].label, "alice");
        assert_eq!(service.recognized().len(), 1);
        assert_eq!(service.recognized()[0].label, "alice");
    }

    #[test]
    fn test_invalid_query_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let service = FaceService::open(&config(dir.path(), 2, 0.3)).unwrap();
        let err = service.recognize(&emb(&[1.0]), None).unwrap_err();
        assert!(matches!(
            err,
            FaceIdError::Validation(ValidationError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(service.recognized().is_empty());
    }

    #[test]
    fn test_empty_gallery_recognition() {
        let dir = tempfile::tempdir().unwrap();
        let service = FaceService::open(&config(dir.path(), 2, 0.3)).unwrap();
        let rec = service.recognize(&emb(&[0.0, 0.0]), None).unwrap();
        assert_eq!(rec.result, MatchResult::unknown(None));
        assert_eq!(rec.entry.confidence, None);
    }

    #[test]
    fn test_explicit_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let service = FaceService::open(&config(dir.path(), 2, 0.3)).unwrap();
        service.register("alice", emb(&[0.0, 0.0]), None).unwrap();
        let probe = emb(&[3.0, 4.0]);
        assert!(!service.recognize(&probe, None).unwrap().result.is_match());
        assert!(!service.recognize_with_threshold(&probe, 5.0, None).unwrap().result.is_match());
        assert!(service.recognize_with_threshold(&probe, 5.5, None).unwrap().result.is_match());
    }

    #[test]
    fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let service = FaceService::open(&config(dir.path(), 4, 0.3)).unwrap();
        let status = service.status();
        assert_eq!(status["dimension"], 4);
        assert_eq!(status["records"], 0);
        assert_eq!(status["recognitions"], 0);
    }
}
