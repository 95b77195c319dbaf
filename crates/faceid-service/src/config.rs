use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Distance below which a probe is accepted as a registered identity.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.3;
/// Facenet embedding length.
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Service configuration, loaded from an optional TOML file and `FACEID_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the default gallery, history and audit files.
    pub data_dir: PathBuf,
    /// Gallery snapshot (registered identities).
    pub gallery_path: PathBuf,
    /// Recognition history.
    pub history_path: PathBuf,
    /// Plain-text audit log.
    pub audit_log_path: PathBuf,
    /// Embedding length produced by the extractor.
    pub embedding_dim: usize,
    /// Exclusive Euclidean distance threshold for a match.
    pub match_threshold: f32,
}

/// Keys accepted in the TOML config file. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub gallery_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,
    pub embedding_dim: Option<usize>,
    pub match_threshold: Option<f32>,
}

impl Config {
    /// Load configuration from `FACEID_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::resolve(FileConfig::default(), |key| std::env::var(key).ok())
    }

    /// Load the TOML file named by `FACEID_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let Ok(path) = std::env::var("FACEID_CONFIG") else {
            return Ok(Self::from_env());
        };
        let file = FileConfig::read(PathBuf::from(path))?;
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge file values and environment lookups. Environment wins.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = env("FACEID_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| {
                env("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| {
                        let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("faceid")
            });

        let path_or = |key: &str, file_value: Option<PathBuf>, default: &str| {
            env(key)
                .map(PathBuf::from)
                .or(file_value)
                .unwrap_or_else(|| data_dir.join(default))
        };

        let gallery_path = path_or("FACEID_GALLERY_PATH", file.gallery_path, "registered.json");
        let history_path = path_or("FACEID_HISTORY_PATH", file.history_path, "recognized.json");
        let audit_log_path = path_or("FACEID_AUDIT_LOG", file.audit_log_path, "audit.log");

        Self {
            embedding_dim: parse_env(&env, "FACEID_EMBEDDING_DIM")
                .or(file.embedding_dim)
                .unwrap_or(DEFAULT_EMBEDDING_DIM),
            match_threshold: parse_env(&env, "FACEID_MATCH_THRESHOLD")
                .or(file.match_threshold)
                .unwrap_or(DEFAULT_MATCH_THRESHOLD),
            data_dir,
            gallery_path,
            history_path,
            audit_log_path,
        }
    }
}

impl FileConfig {
    pub fn read(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}
