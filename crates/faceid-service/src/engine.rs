use crate::service::{FaceService, Recognition, Registration};
use faceid_core::{Embedder, Embedding, ExtractionError, FaceIdError, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    FaceId(#[from] FaceIdError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("blocking task failed: {0}")]
    Task(String),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    Embed {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Embedding, ExtractionError>>,
    },
}

/// Clone-safe handle to the engine thread and the shared face service.
///
/// Extraction is serialized on the engine thread, which owns the embedder.
/// Gallery and history work runs on the blocking pool, so concurrent
/// recognitions only contend on the gallery's read lock.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    service: Arc<FaceService>,
}

impl EngineHandle {
    /// Decode and embed an uploaded image, then register it under `label`.
    pub async fn register_image(
        &self,
        label: String,
        image: Vec<u8>,
        filename: Option<String>,
    ) -> Result<Registration, EngineError> {
        if label.trim().is_empty() {
            return Err(FaceIdError::from(ValidationError::EmptyLabel).into());
        }
        let embedding = self.embed(image).await?;
        self.register(label, embedding, filename).await
    }

    /// Decode and embed an uploaded image, then match it against the gallery.
    pub async fn recognize_image(
        &self,
        image: Vec<u8>,
        filename: Option<String>,
    ) -> Result<Recognition, EngineError> {
        let embedding = self.embed(image).await?;
        self.recognize(embedding, filename).await
    }

    /// Register a precomputed embedding.
    pub async fn register(
        &self,
        label: String,
        embedding: Embedding,
        filename: Option<String>,
    ) -> Result<Registration, EngineError> {
        let service = Arc::clone(&self.service);
        let registration = tokio::task::spawn_blocking(move || {
            service.register(&label, embedding, filename.as_deref())
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;
        Ok(registration)
    }

    /// Match a precomputed embedding with the configured threshold.
    pub async fn recognize(
        &self,
        embedding: Embedding,
        filename: Option<String>,
    ) -> Result<Recognition, EngineError> {
        let service = Arc::clone(&self.service);
        let recognition = tokio::task::spawn_blocking(move || {
            service.recognize(&embedding, filename.as_deref())
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;
        Ok(recognition)
    }

    pub fn service(&self) -> &Arc<FaceService> {
        &self.service
    }

    async fn embed(&self, image: Vec<u8>) -> Result<Embedding, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Embed {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        let embedding = reply_rx.await.map_err(|_| EngineError::ChannelClosed)??;
        Ok(embedding)
    }
}

/// Spawn the engine on a dedicated OS thread that owns `embedder`.
///
/// The thread exits once every [`EngineHandle`] clone is dropped.
pub fn spawn_engine<E: Embedder + 'static>(
    mut embedder: E,
    service: Arc<FaceService>,
) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("faceid-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Embed { image, reply } => {
                        let result = faceid_core::embed_bytes(&mut embedder, &image);
                        if let Err(e) = &result {
                            tracing::warn!(error = %e, bytes = image.len(), "embedding extraction failed");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, service })
}
