use std::env;
use std::time::Duration;

use crate::config::{ConfigError, parse_secs_from_env, parse_string_from_env, parse_u32_from_env};
use crate::constants::{DEFAULT_FALLBACK_MODEL, DEFAULT_MODEL};

pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 30;
pub const DEFAULT_CONNECT_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_ACQUIRE_ATTEMPTS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Connectivity polling: `attempts` checks, `interval` apart.
///
/// `interval` also bounds each check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_CONNECT_INTERVAL_SECS),
        }
    }
}

/// Acquisition retry: bounded attempts, a deadline per attempt, a fixed delay between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ACQUIRE_ATTEMPTS,
            attempt_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub primary_model: String,
    /// `None` disables the fallback path.
    pub fallback_model: Option<String>,
    pub poll: PollPolicy,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary_model: DEFAULT_MODEL.to_string(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            poll: PollPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    const ENV_MODEL: &'static str = "CROSSRANK_MODEL";
    const ENV_FALLBACK_MODEL: &'static str = "CROSSRANK_FALLBACK_MODEL";
    const ENV_CONNECT_ATTEMPTS: &'static str = "CROSSRANK_CONNECT_ATTEMPTS";
    const ENV_CONNECT_INTERVAL_SECS: &'static str = "CROSSRANK_CONNECT_INTERVAL_SECS";
    const ENV_ACQUIRE_ATTEMPTS: &'static str = "CROSSRANK_ACQUIRE_ATTEMPTS";
    const ENV_ACQUIRE_TIMEOUT_SECS: &'static str = "CROSSRANK_ACQUIRE_TIMEOUT_SECS";
    const ENV_RETRY_DELAY_SECS: &'static str = "CROSSRANK_RETRY_DELAY_SECS";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let primary_model = parse_string_from_env(Self::ENV_MODEL, defaults.primary_model);

        // Unset keeps the default fallback; set-but-empty disables it.
        let fallback_model = match env::var(Self::ENV_FALLBACK_MODEL) {
            Ok(v) => Some(v.trim().to_string()),
            Err(_) => defaults.fallback_model,
        };

        let poll = PollPolicy {
            attempts: parse_u32_from_env(Self::ENV_CONNECT_ATTEMPTS, defaults.poll.attempts),
            interval: parse_secs_from_env(Self::ENV_CONNECT_INTERVAL_SECS, defaults.poll.interval),
        };

        let retry = RetryPolicy {
            max_attempts: parse_u32_from_env(Self::ENV_ACQUIRE_ATTEMPTS, defaults.retry.max_attempts),
            attempt_timeout: parse_secs_from_env(
                Self::ENV_ACQUIRE_TIMEOUT_SECS,
                defaults.retry.attempt_timeout,
            ),
            retry_delay: parse_secs_from_env(Self::ENV_RETRY_DELAY_SECS, defaults.retry.retry_delay),
        };

        let config = Self::new(primary_model, fallback_model).with_policies(poll, retry);
        config.validate()?;
        Ok(config)
    }

    /// Builds a config with default policies.
    ///
    /// An empty fallback, or one equal to the primary, disables the fallback path.
    pub fn new(primary_model: impl Into<String>, fallback_model: Option<String>) -> Self {
        let primary_model = primary_model.into();
        let fallback_model = fallback_model
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty() && *f != primary_model);

        Self {
            primary_model,
            fallback_model,
            ..Self::default()
        }
    }

    pub fn with_policies(mut self, poll: PollPolicy, retry: RetryPolicy) -> Self {
        self.poll = poll;
        self.retry = retry;
        self
    }

    /// Small, fast policies for tests driven by a fake clock.
    pub fn for_testing(primary_model: &str, fallback_model: Option<&str>) -> Self {
        Self::new(primary_model, fallback_model.map(str::to_string)).with_policies(
            PollPolicy {
                attempts: 3,
                interval: Duration::from_secs(2),
            },
            RetryPolicy {
                max_attempts: 5,
                attempt_timeout: Duration::from_secs(600),
                retry_delay: Duration::from_secs(10),
            },
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.poll.attempts == 0 {
            return Err(ConfigError::TooSmall {
                name: Self::ENV_CONNECT_ATTEMPTS,
                min: 1,
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::TooSmall {
                name: Self::ENV_ACQUIRE_ATTEMPTS,
                min: 1,
            });
        }
        if self.poll.interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_CONNECT_INTERVAL_SECS,
            });
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_ACQUIRE_TIMEOUT_SECS,
            });
        }
        Ok(())
    }
}
