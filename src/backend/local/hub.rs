use std::path::{Path, PathBuf};

use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Cache, Repo, RepoType};
use tracing::{debug, info, instrument};

use crate::backend::BackendError;

/// Files a cross-encoder snapshot needs to be loadable.
pub const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Hugging Face hub cache rooted at the configured model cache directory.
#[derive(Debug, Clone)]
pub struct ModelHub {
    cache_dir: PathBuf,
}

impl ModelHub {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn repo(model: &str) -> Repo {
        Repo::new(model.to_string(), RepoType::Model)
    }

    /// Directory holding the repo's blobs, refs and snapshots.
    pub fn repo_dir(&self, model: &str) -> PathBuf {
        self.cache_dir.join(Self::repo(model).folder_name())
    }

    /// Returns the snapshot directory if every file in [`MODEL_FILES`] is cached.
    pub fn cached_snapshot(&self, model: &str) -> Option<PathBuf> {
        let cache = Cache::new(self.cache_dir.clone());
        let repo = cache.repo(Self::repo(model));

        let mut snapshot: Option<PathBuf> = None;
        for file in MODEL_FILES {
            let path = repo.get(file)?;
            if snapshot.is_none() {
                snapshot = path.parent().map(Path::to_path_buf);
            }
        }
        snapshot
    }

    /// Downloads every file in [`MODEL_FILES`] into the cache.
    #[instrument(skip(self))]
    pub async fn download(&self, model: &str) -> Result<PathBuf, BackendError> {
        let start = std::time::Instant::now();
        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(false)
            .build()
            .map_err(|e| BackendError::AcquisitionFailed {
                model: model.to_string(),
                reason: e.to_string(),
            })?;
        let repo = api.repo(Self::repo(model));

        for file in MODEL_FILES {
            info!("Downloading `{}`", file);
            repo.get(file)
                .await
                .map_err(|e| BackendError::AcquisitionFailed {
                    model: model.to_string(),
                    reason: format!("{file}: {e}"),
                })?;
        }

        info!("Model artifacts downloaded in {:?}", start.elapsed());

        self.cached_snapshot(model)
            .ok_or_else(|| BackendError::AcquisitionFailed {
                model: model.to_string(),
                reason: "download finished but snapshot is incomplete".to_string(),
            })
    }

    /// Deletes the repo folder, including partial blobs and lock files.
    pub async fn remove(&self, model: &str) -> Result<(), BackendError> {
        let dir = self.repo_dir(model);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Removed cached model artifacts");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
