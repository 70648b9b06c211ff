use std::sync::Arc;

use tracing::info;

use super::config::{BackendConfig, BackendKind};
use super::error::BackendError;
use super::local::LocalBackend;
use super::remote::RemoteBackend;
use super::ModelBackend;

/// Builds the backend selected by `config`. Called once at process composition.
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn ModelBackend>, BackendError> {
    let backend: Arc<dyn ModelBackend> = match config.kind {
        BackendKind::Local => Arc::new(LocalBackend::new(config.model_cache.clone())),
        BackendKind::Remote => Arc::new(RemoteBackend::new(
            &config.remote_url,
            config.max_input_chars,
        )?),
    };

    info!(
        backend = %backend.kind(),
        device = %backend.device(),
        "Scoring backend composed"
    );

    Ok(backend)
}
