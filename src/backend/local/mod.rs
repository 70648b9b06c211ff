//! In-process candle cross-encoder backend.
//!
//! Models are fetched from the Hugging Face hub into the model cache; the cache
//! doubles as the presence check, so a pre-populated volume skips the download.

pub mod classifier;
pub mod cross_encoder;
pub mod device;
pub mod hub;
pub mod tokenizer;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::Device;
use parking_lot::Mutex;
use tracing::debug;

pub use cross_encoder::CrossEncoder;
pub use device::{device_label, select_device};
pub use hub::{MODEL_FILES, ModelHub};

use super::{BackendError, BackendKind, ModelBackend, Scorer};

/// Local backend: hub cache for lifecycle, candle for scoring.
pub struct LocalBackend {
    hub: ModelHub,
    device: Device,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("cache_dir", &self.hub.cache_dir())
            .field("device", &device_label(&self.device))
            .finish()
    }
}

impl LocalBackend {
    pub fn new(cache_dir: PathBuf) -> Self {
        let device = select_device();
        debug!(device = device_label(&device), "Selected compute device for cross-encoder");
        Self::with_device(cache_dir, device)
    }

    pub fn with_device(cache_dir: PathBuf, device: Device) -> Self {
        Self {
            hub: ModelHub::new(cache_dir),
            device,
        }
    }

    pub fn hub(&self) -> &ModelHub {
        &self.hub
    }
}

#[async_trait]
impl ModelBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn device(&self) -> String {
        device_label(&self.device).to_string()
    }

    async fn ping(&self) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(self.hub.cache_dir()).await?;
        Ok(())
    }

    async fn has_model(&self, model: &str) -> Result<bool, BackendError> {
        Ok(self.hub.cached_snapshot(model).is_some())
    }

    async fn acquire(&self, model: &str) -> Result<(), BackendError> {
        self.hub.download(model).await.map(|_| ())
    }

    async fn cleanup(&self, model: &str) -> Result<(), BackendError> {
        self.hub.remove(model).await
    }

    async fn load(&self, model: &str) -> Result<Arc<dyn Scorer>, BackendError> {
        let snapshot = self
            .hub
            .cached_snapshot(model)
            .ok_or_else(|| BackendError::ModelNotFound {
                model: model.to_string(),
            })?;
        let device = self.device.clone();

        let encoder = tokio::task::spawn_blocking(move || CrossEncoder::load(&snapshot, &device))
            .await
            .map_err(|e| BackendError::ModelLoadFailed {
                reason: format!("model load task failed: {e}"),
            })??;

        Ok(Arc::new(LocalScorer::new(model, encoder)))
    }
}

/// Serving handle over a loaded [`CrossEncoder`].
///
/// Calls run on the blocking pool, one at a time.
pub struct LocalScorer {
    model_name: String,
    encoder: Arc<Mutex<CrossEncoder>>,
}

impl LocalScorer {
    pub fn new(model_name: &str, encoder: CrossEncoder) -> Self {
        Self {
            model_name: model_name.to_string(),
            encoder: Arc::new(Mutex::new(encoder)),
        }
    }
}

#[async_trait]
impl Scorer for LocalScorer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn score_batch(
        &self,
        query: &str,
        passages: &[String],
    ) -> Result<Vec<f32>, BackendError> {
        let encoder = Arc::clone(&self.encoder);
        let query = query.to_string();
        let passages = passages.to_vec();

        tokio::task::spawn_blocking(move || encoder.lock().score_batch(&query, &passages))
            .await
            .map_err(|e| BackendError::InferenceFailed {
                reason: format!("scoring task failed: {e}"),
            })?
    }
}
