use std::path::Path;

use tokenizers::{
    PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy,
};

use crate::backend::BackendError;

const PAD_TOKENS: [&str; 2] = ["[PAD]", "<pad>"];

/// Loads `tokenizer.json` from `model_dir` with pair truncation and batch padding.
///
/// Pairs longer than `max_len` tokens are cut longest-first, which is the
/// deterministic truncation policy of the local backend.
pub fn load_tokenizer_with_truncation(
    model_dir: &Path,
    max_len: usize,
) -> Result<Tokenizer, BackendError> {
    let path = model_dir.join("tokenizer.json");
    let mut tokenizer =
        Tokenizer::from_file(&path).map_err(|e| BackendError::ModelLoadFailed {
            reason: format!("failed to load tokenizer from {}: {e}", path.display()),
        })?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            strategy: TruncationStrategy::LongestFirst,
            ..Default::default()
        }))
        .map_err(|e| BackendError::ModelLoadFailed {
            reason: format!("invalid truncation settings: {e}"),
        })?;

    let (pad_token, pad_id) = PAD_TOKENS
        .iter()
        .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
        .unwrap_or_else(|| ("[PAD]".to_string(), 0));

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    }));

    Ok(tokenizer)
}
