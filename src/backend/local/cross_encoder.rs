use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use super::classifier::Classifier;
use super::tokenizer::load_tokenizer_with_truncation;
use crate::backend::BackendError;
use crate::constants::MAX_SEQ_LEN;

/// Candle cross-encoder loaded from a model snapshot directory.
///
/// Not assumed to be reentrant; [`super::LocalScorer`] serializes access.
pub struct CrossEncoder {
    device: Device,
    model: Classifier,
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for CrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoder")
            .field("device", &format!("{:?}", self.device))
            .finish()
    }
}

impl CrossEncoder {
    pub fn load(model_dir: &Path, device: &Device) -> Result<Self, BackendError> {
        if !model_dir.exists() {
            return Err(BackendError::ModelLoadFailed {
                reason: format!("Model path not found: {}", model_dir.display()),
            });
        }

        let config_path = model_dir.join("config.json");
        if !config_path.exists() {
            return Err(BackendError::ModelLoadFailed {
                reason: format!("Missing config.json in {}", model_dir.display()),
            });
        }

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(BackendError::ModelLoadFailed {
                reason: format!("Missing model.safetensors in {}", model_dir.display()),
            });
        }

        info!(model_dir = %model_dir.display(), "Loading cross-encoder");

        let model = Classifier::load(model_dir, device).map_err(|e| {
            BackendError::ModelLoadFailed {
                reason: format!("Failed to load cross-encoder: {}", e),
            }
        })?;

        let tokenizer = load_tokenizer_with_truncation(model_dir, MAX_SEQ_LEN)?;

        Ok(Self {
            device: device.clone(),
            model,
            tokenizer,
        })
    }

    /// Scores `passages` against `query` in one forward pass.
    pub fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>, BackendError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            query_len = query.len(),
            num_passages = passages.len(),
            "Scoring passages"
        );

        let inputs: Vec<(&str, &str)> = passages.iter().map(|p| (query, p.as_str())).collect();
        let encodings = self.tokenizer.encode_batch(inputs, true).map_err(|e| {
            BackendError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let token_ids = self.stack(&encodings, Encoding::get_ids)?;
        let type_ids = self.stack(&encodings, Encoding::get_type_ids)?;
        let attention_mask = self.stack(&encodings, Encoding::get_attention_mask)?;

        let logits = self
            .model
            .forward(&token_ids, &type_ids, &attention_mask)?;

        Ok(logits.flatten_all()?.to_vec1::<f32>()?)
    }

    fn stack(
        &self,
        encodings: &[Encoding],
        field: fn(&Encoding) -> &[u32],
    ) -> Result<Tensor, BackendError> {
        let rows = encodings
            .iter()
            .map(|e| Tensor::new(field(e), &self.device))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }
}
