//! Server configuration
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (`GREETCARD_*`)
//! 4. Command-line flags (applied by the binary)

use greetcard_core::claim::{ExpiringRegistry, MemoryRegistry, SubmissionRegistry};
use greetcard_core::UnknownCallerPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for config overrides
pub const ENV_PREFIX: &str = "GREETCARD_";

const DEFAULT_SENDER: &str = "noreply@localhost";
const DEFAULT_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("relay.url is required unless relay.dry_run is set")]
    MissingRelayUrl,
}

/// Submission registry backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// Entries live for the whole process
    #[default]
    Memory,
    /// Entries expire after `ttl_secs`; at most `max_entries` are kept
    Expiring { ttl_secs: u64, max_entries: u64 },
}

impl RegistryConfig {
    /// Build the configured registry
    #[must_use]
    pub fn build(&self) -> Arc<dyn SubmissionRegistry> {
        match *self {
            Self::Memory => Arc::new(MemoryRegistry::new()),
            Self::Expiring {
                ttl_secs,
                max_entries,
            } => Arc::new(ExpiringRegistry::new(
                Duration::from_secs(ttl_secs),
                max_entries,
            )),
        }
    }
}

/// Outbound mail relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Relay endpoint receiving `POST` of the mail as JSON
    pub url: Option<String>,
    /// Sender address on every mail
    pub from: String,
    /// Upper bound on one relay call; unbounded when unset
    pub timeout_secs: Option<u64>,
    /// Log mails instead of sending them
    pub dry_run: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: None,
            from: DEFAULT_SENDER.to_string(),
            timeout_secs: None,
            dry_run: false,
        }
    }
}

impl RelaySettings {
    /// Relay call timeout, if bounded
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub registry: RegistryConfig,
    pub unknown_caller: UnknownCallerPolicy,
    pub relay: RelaySettings,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            registry: RegistryConfig::default(),
            unknown_caller: UnknownCallerPolicy::default(),
            relay: RelaySettings::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document over the defaults
    ///
    /// # Errors
    /// - `ConfigError::Parse` if the document is not valid
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Load defaults, then the optional file, then the process environment
    ///
    /// # Errors
    /// - `ConfigError::Read` / `ConfigError::Parse` for a bad file
    /// - `ConfigError::InvalidEnv` for an unparseable override
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let document =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_toml(&document)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        tracing::debug!(
            listen_addr = %config.listen_addr,
            registry = ?config.registry,
            dry_run = config.relay.dry_run,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply `GREETCARD_*` overrides read through `lookup`
    ///
    /// # Errors
    /// - `ConfigError::InvalidEnv` naming the first bad variable
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("LISTEN_ADDR") {
            self.listen_addr = parse(&name, &value)?;
        }
        if let Some((name, value)) = var("REGISTRY") {
            self.registry = match value.as_str() {
                "memory" => RegistryConfig::Memory,
                "expiring" => match self.registry {
                    expiring @ RegistryConfig::Expiring { .. } => expiring,
                    RegistryConfig::Memory => RegistryConfig::Expiring {
                        ttl_secs: DEFAULT_TTL_SECS,
                        max_entries: DEFAULT_MAX_ENTRIES,
                    },
                },
                _ => return Err(invalid(&name, &value)),
            };
        }
        if let RegistryConfig::Expiring {
            ttl_secs,
            max_entries,
        } = &mut self.registry
        {
            if let Some((name, value)) = var("REGISTRY_TTL_SECS") {
                *ttl_secs = parse(&name, &value)?;
            }
            if let Some((name, value)) = var("REGISTRY_MAX_ENTRIES") {
                *max_entries = parse(&name, &value)?;
            }
        }
        if let Some((name, value)) = var("UNKNOWN_CALLER") {
            self.unknown_caller = match value.as_str() {
                "shared" => UnknownCallerPolicy::Shared,
                "reject" => UnknownCallerPolicy::Reject,
                _ => return Err(invalid(&name, &value)),
            };
        }
        if let Some((_, value)) = var("RELAY_URL") {
            self.relay.url = Some(value);
        }
        if let Some((_, value)) = var("RELAY_FROM") {
            self.relay.from = value;
        }
        if let Some((name, value)) = var("RELAY_TIMEOUT_SECS") {
            self.relay.timeout_secs = Some(parse(&name, &value)?);
        }
        if let Some((name, value)) = var("DRY_RUN") {
            self.relay.dry_run = parse(&name, &value)?;
        }
        if let Some((name, value)) = var("LOG_FORMAT") {
            self.log_format = match value.as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(invalid(&name, &value)),
            };
        }
        Ok(())
    }

    /// Check settings that only matter once the server starts
    ///
    /// # Errors
    /// - `ConfigError::MissingRelayUrl` if mail cannot be delivered anywhere
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.url.is_none() && !self.relay.dry_run {
            return Err(ConfigError::MissingRelayUrl);
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        var: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.registry, RegistryConfig::Memory);
        assert_eq!(config.unknown_caller, UnknownCallerPolicy::Shared);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            listen_addr = "0.0.0.0:8080"
            unknown_caller = "reject"
            log_format = "json"

            [registry]
            kind = "expiring"
            ttl_secs = 3600
            max_entries = 10

            [relay]
            url = "http://relay.local/send"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.unknown_caller, UnknownCallerPolicy::Reject);
        assert_eq!(
            config.registry,
            RegistryConfig::Expiring {
                ttl_secs: 3600,
                max_entries: 10
            }
        );
        assert_eq!(config.relay.from, DEFAULT_SENDER);
        assert_eq!(config.relay.timeout(), Some(Duration::from_secs(5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file() {
        let mut config =
            ServerConfig::from_toml("[relay]\nurl = \"http://file\"\nfrom = \"a@b\"").unwrap();
        config
            .apply_env(env(&[
                ("GREETCARD_RELAY_URL", "http://env"),
                ("GREETCARD_REGISTRY", "expiring"),
                ("GREETCARD_REGISTRY_TTL_SECS", "60"),
                ("GREETCARD_DRY_RUN", "true"),
            ]))
            .unwrap();

        assert_eq!(config.relay.url.as_deref(), Some("http://env"));
        assert_eq!(config.relay.from, "a@b");
        assert!(config.relay.dry_run);
        assert_eq!(
            config.registry,
            RegistryConfig::Expiring {
                ttl_secs: 60,
                max_entries: DEFAULT_MAX_ENTRIES
            }
        );
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(env(&[("GREETCARD_UNKNOWN_CALLER", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { ref var, .. } if var == "GREETCARD_UNKNOWN_CALLER"
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/greetcard.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greetcard.toml");
        std::fs::write(&path, "[relay]\ndry_run = true\n").unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert!(config.relay.dry_run);
    }
}
