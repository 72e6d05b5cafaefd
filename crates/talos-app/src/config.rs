//! Environment-driven client configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use talos_api::{DEFAULT_REQUEST_TIMEOUT, TransportConfig, TransportError, validate_base_url};
use talos_auth::DEFAULT_IDLE_BUDGET;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

/// Server base URL.
pub const URL_ENV: &str = "TALOS_URL";
/// Idle session budget in seconds.
pub const IDLE_TIMEOUT_ENV: &str = "TALOS_IDLE_TIMEOUT_SECS";
/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "TALOS_REQUEST_TIMEOUT_SECS";
/// Path of a PEM bundle (certificate + key) for mutual TLS.
pub const IDENTITY_ENV: &str = "TALOS_CLIENT_IDENTITY";
/// Log filter directive; falls back to `RUST_LOG`.
pub const LOG_ENV: &str = "TALOS_LOG";

/// Server URL used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server base URL.
    pub server_url: Url,
    /// Idle budget before automatic logout.
    pub idle_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Client identity PEM path.
    pub identity_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// Unset or blank variables take their defaults.
    ///
    /// # Errors
    /// - [`ConfigError::Url`] for a rejected server URL.
    /// - [`ConfigError::InvalidSeconds`] for non-numeric or zero durations.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let server_url = validate_base_url(
            value(URL_ENV)
                .as_deref()
                .unwrap_or(DEFAULT_SERVER_URL),
        )?;
        let idle_timeout = match value(IDLE_TIMEOUT_ENV) {
            Some(raw) => parse_seconds(IDLE_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_IDLE_BUDGET,
        };
        let request_timeout = match value(REQUEST_TIMEOUT_ENV) {
            Some(raw) => parse_seconds(REQUEST_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            server_url,
            idle_timeout,
            request_timeout,
            identity_path: value(IDENTITY_ENV).map(PathBuf::from),
        })
    }

    /// Builds transport settings, loading the identity PEM when configured.
    ///
    /// # Errors
    /// Returns [`ConfigError::Identity`] when the PEM file cannot be read.
    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        let identity_pem = match &self.identity_path {
            Some(path) => Some(Zeroizing::new(fs::read(path).map_err(|source| {
                ConfigError::Identity {
                    path: path.clone(),
                    source,
                }
            })?)),
            None => None,
        };

        Ok(TransportConfig {
            timeout: self.request_timeout,
            identity_pem,
        })
    }
}

fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidSeconds {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Server URL rejected.
    #[error(transparent)]
    Url(#[from] TransportError),
    /// Duration variable is not a positive integer.
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// Identity PEM unreadable.
    #[error("cannot read client identity {}: {source}", path.display())]
    Identity {
        /// Configured path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config.server_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.idle_timeout, DEFAULT_IDLE_BUDGET);
        assert_eq!(config.identity_path, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup(&[
            (URL_ENV, "https://vault.example.test"),
            (IDLE_TIMEOUT_ENV, "60"),
            (REQUEST_TIMEOUT_ENV, " 5 "),
            (IDENTITY_ENV, "/etc/talos/client.pem"),
        ]))
        .expect("overrides are valid");

        assert_eq!(config.server_url.host_str(), Some("vault.example.test"));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.identity_path,
            Some(PathBuf::from("/etc/talos/client.pem"))
        );
    }

    #[test]
    fn rejects_zero_and_garbage_durations() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(IDLE_TIMEOUT_ENV, "0")])),
            Err(ConfigError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(REQUEST_TIMEOUT_ENV, "soon")])),
            Err(ConfigError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(URL_ENV, "ftp://vault")])),
            Err(ConfigError::Url(_))
        ));
    }
}
