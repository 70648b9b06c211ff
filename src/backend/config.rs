use std::env;
use std::path::PathBuf;

use crate::config::{ConfigError, parse_string_from_env, parse_usize_from_env};
use crate::constants::DEFAULT_MAX_INPUT_CHARS;

/// Default base URL of the remote inference service.
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:11434";

/// Default directory for downloaded local models.
pub const DEFAULT_MODEL_CACHE: &str = "./.models";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which backend implementation the process is composed with.
pub enum BackendKind {
    #[default]
    /// In-process candle cross-encoder.
    Local,
    /// Remote inference service over HTTP.
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "candle" => Ok(Self::Local),
            "remote" | "http" => Ok(Self::Remote),
            _ => Err(ConfigError::UnknownBackend {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
/// Backend composition settings.
pub struct BackendConfig {
    /// Backend implementation.
    pub kind: BackendKind,
    /// Base URL of the remote service (remote backend only).
    pub remote_url: String,
    /// Cache directory for downloaded models (local backend only).
    pub model_cache: PathBuf,
    /// Character budget per query+passage pair (remote backend only).
    pub max_input_chars: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            model_cache: PathBuf::from(DEFAULT_MODEL_CACHE),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl BackendConfig {
    const ENV_BACKEND: &'static str = "CROSSRANK_BACKEND";
    const ENV_REMOTE_URL: &'static str = "CROSSRANK_REMOTE_URL";
    const ENV_MODEL_CACHE: &'static str = "CROSSRANK_MODEL_CACHE";
    const ENV_MAX_INPUT_CHARS: &'static str = "CROSSRANK_MAX_INPUT_CHARS";

    /// Loads config from environment variables (with defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let kind = match env::var(Self::ENV_BACKEND) {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.kind,
        };
        let remote_url = parse_string_from_env(Self::ENV_REMOTE_URL, defaults.remote_url);
        let model_cache = env::var(Self::ENV_MODEL_CACHE)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_cache);
        let max_input_chars =
            parse_usize_from_env(Self::ENV_MAX_INPUT_CHARS, defaults.max_input_chars);

        Ok(Self {
            kind,
            remote_url,
            model_cache,
            max_input_chars,
        })
    }

    /// Validates the settings relevant to the selected backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            BackendKind::Remote => {
                let url = self.remote_url.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidUrl {
                        name: Self::ENV_REMOTE_URL,
                        value: self.remote_url.clone(),
                    });
                }
                if self.max_input_chars < 2 {
                    return Err(ConfigError::TooSmall {
                        name: Self::ENV_MAX_INPUT_CHARS,
                        min: 2,
                    });
                }
            }
            BackendKind::Local => {
                if self.model_cache.exists() && !self.model_cache.is_dir() {
                    return Err(ConfigError::NotADirectory {
                        path: self.model_cache.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
