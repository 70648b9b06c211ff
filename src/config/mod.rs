//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `CROSSRANK_*` environment variables.
//! Backend and orchestrator settings live next to their modules
//! ([`crate::backend::BackendConfig`], [`crate::readiness::OrchestratorConfig`]).

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `CROSSRANK_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `0.0.0.0`.
    pub bind_addr: IpAddr,

    /// Allowed CORS origins. Default: any.
    pub cors_origins: CorsOrigins,

    /// Whether scores are normalized when a request does not say. Default: `true`.
    pub normalize_default: bool,

    /// Deadline for a single backend scoring call. Default: 30s.
    pub score_timeout: Duration,
}

/// CORS origin policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `*`: any origin.
    Any,
    /// Explicit allow-list.
    List(Vec<String>),
}

impl std::str::FromStr for CorsOrigins {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let origins: Vec<String> = s
            .split(',')
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Ok(Self::Any)
        } else {
            Ok(Self::List(origins))
        }
    }
}

/// Default scoring deadline in seconds.
pub const DEFAULT_SCORE_TIMEOUT_SECS: u64 = 30;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
            cors_origins: CorsOrigins::Any,
            normalize_default: true,
            score_timeout: Duration::from_secs(DEFAULT_SCORE_TIMEOUT_SECS),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "CROSSRANK_PORT";
    const ENV_BIND_ADDR: &'static str = "CROSSRANK_BIND_ADDR";
    const ENV_CORS_ORIGINS: &'static str = "CROSSRANK_CORS_ORIGINS";
    const ENV_NORMALIZE: &'static str = "CROSSRANK_NORMALIZE";
    const ENV_SCORE_TIMEOUT_SECS: &'static str = "CROSSRANK_SCORE_TIMEOUT_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let cors_origins = env::var(Self::ENV_CORS_ORIGINS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cors_origins);
        let normalize_default = parse_bool_from_env(Self::ENV_NORMALIZE, defaults.normalize_default);
        let score_timeout = parse_secs_from_env(Self::ENV_SCORE_TIMEOUT_SECS, defaults.score_timeout);

        Ok(Self {
            port,
            bind_addr,
            cors_origins,
            normalize_default,
            score_timeout,
        })
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.score_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_SCORE_TIMEOUT_SECS,
            });
        }
        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }
}

/// Reads a boolean flag; anything other than `false`/`0`/`no` counts as true.
pub(crate) fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v != "false" && v != "0" && v != "no"
        })
        .unwrap_or(default)
}

pub(crate) fn parse_secs_from_env(var_name: &str, default: Duration) -> Duration {
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

pub(crate) fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_string_from_env(var_name: &str, default: String) -> String {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}
