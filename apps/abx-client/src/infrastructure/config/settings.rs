//! Client Configuration Settings
//!
//! Configuration types for the ABX client, loaded from environment variables.

use std::fmt;
use std::time::Duration;

use crate::application::services::BackfillRetryConfig;

/// Output format for the operator binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `Seq:.. SYMB S Qty:.. Price:..` line per record.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl OutputFormat {
    /// Parse output format from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Get the format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Address of the exchange server.
///
/// These are the only endpoint options; there is no global host/port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerEndpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connection-layer timeouts.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Maximum time to establish the TCP connection.
    pub connect_timeout: Duration,
    /// Maximum time a single read may wait before the stream counts as stalled.
    pub read_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Exchange server address.
    pub endpoint: ServerEndpoint,
    /// Connection timeouts.
    pub transport: TransportSettings,
    /// Backfill retry behavior.
    pub backfill: BackfillRetryConfig,
    /// Operator output format.
    pub output: OutputFormat,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = EnvReader { lookup };

        let host = match env.get("ABX_HOST") {
            Some(host) if host.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("ABX_HOST".to_string()));
            }
            Some(host) => host.trim().to_string(),
            None => defaults.endpoint.host,
        };

        let endpoint = ServerEndpoint {
            host,
            port: env.parse("ABX_PORT", defaults.endpoint.port)?,
        };

        let transport = TransportSettings {
            connect_timeout: env.duration_millis(
                "ABX_CONNECT_TIMEOUT_MS",
                defaults.transport.connect_timeout,
            )?,
            read_timeout: env
                .duration_millis("ABX_READ_TIMEOUT_MS", defaults.transport.read_timeout)?,
        };

        let max_attempts: u32 =
            env.parse("ABX_BACKFILL_MAX_ATTEMPTS", defaults.backfill.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ABX_BACKFILL_MAX_ATTEMPTS".to_string(),
                value: "0".to_string(),
            });
        }

        let backfill = BackfillRetryConfig {
            max_attempts,
            initial_delay: env.duration_millis(
                "ABX_BACKFILL_RETRY_DELAY_MS",
                defaults.backfill.initial_delay,
            )?,
            ..defaults.backfill
        };

        let output = env
            .get("ABX_OUTPUT")
            .map(|s| OutputFormat::from_str_case_insensitive(&s))
            .unwrap_or_default();

        Ok(Self {
            endpoint,
            transport,
            backfill,
            output,
            metrics_port: env.parse("ABX_METRICS_PORT", defaults.metrics_port)?,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        }
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }
}
