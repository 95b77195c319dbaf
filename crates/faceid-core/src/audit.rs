//! Plain-text audit trail of registrations and recognitions.
//!
//! One line per action:
//! `[2024-01-31 12:00:00] Action: recognize, User: alice, File: alice_p.jpg, Type: Cloud, Confidence: 0.93`

use crate::error::PersistenceError;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single audited action. Absent fields are left out of the line.
#[derive(Debug, Clone, Default)]
pub struct AuditEvent<'a> {
    pub action: &'a str,
    pub user: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub recognition_type: Option<&'a str>,
    pub confidence: Option<f64>,
}

impl<'a> AuditEvent<'a> {
    pub fn new(action: &'a str) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    pub fn filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }

    pub fn recognition_type(mut self, recognition_type: &'a str) -> Self {
        self.recognition_type = Some(recognition_type);
        self
    }

    pub fn confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    /// Render the line without its trailing newline.
    pub fn format_line(&self, timestamp: &str) -> String {
        let mut line = format!("[{timestamp}] Action: {}", self.action);
        for (key, value) in [
            ("User", self.user),
            ("File", self.filename),
            ("Type", self.recognition_type),
        ] {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                line.push_str(&format!(", {key}: {v}"));
            }
        }
        if let Some(c) = self.confidence {
            line.push_str(&format!(", Confidence: {c:.2}"));
        }
        line
    }
}

/// Append-only audit log file.
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Append `event` stamped with the current local time.
    pub fn record(&self, event: &AuditEvent<'_>) -> Result<(), PersistenceError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = event.format_line(&timestamp);

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| PersistenceError::io(&self.path, e))?;

        tracing::debug!(action = event.action, user = ?event.user, "audit recorded");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
