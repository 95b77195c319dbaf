//! faceid-service — Registration and recognition on top of `faceid-core`.
//!
//! [`FaceService`] ties the gallery, recognition history and audit log
//! together; [`spawn_engine`] runs an [`Embedder`](faceid_core::Embedder) on
//! its own thread so image uploads can be registered and recognized from
//! async request handlers.

pub mod config;
pub mod engine;
pub mod service;

pub use config::{Config, ConfigError};
pub use engine::{spawn_engine, EngineError, EngineHandle};
pub use service::{stored_filename, FaceService, Recognition, Registration};
