//! Configuration management for identhub
//!
//! This module provides file and environment based configuration with
//! defaults and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Longest accepted `saml.assertion_lifetime`
pub const MAX_ASSERTION_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Longest accepted `saml.session_lifetime`
pub const MAX_SESSION_LIFETIME: Duration = Duration::from_secs(30 * 24 * 3600);

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Identity session configuration
    pub identity: IdentityConfig,

    /// Token issuance configuration
    pub token: TokenConfig,

    /// SAML identity provider configuration
    pub saml: SamlConfig,

    /// Directory store configuration
    pub dht: DhtConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Identity session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Namespace every key published by this session is scoped to
    pub namespace: String,

    /// Namespace authentication records are filed under
    pub hub_namespace: String,

    /// Alias the server identity is created or loaded under
    pub alias: String,

    /// Directory for password-sealed keypairs. Keys are session-only when unset.
    pub keystore_dir: Option<PathBuf>,
}

/// Token issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime used when a caller does not pass one
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
}

/// SAML identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamlConfig {
    /// Entity id published in metadata and used as assertion issuer
    pub entity_id: String,

    /// Single sign-on endpoint
    pub sso_url: String,

    /// Validity window of an issued assertion
    #[serde(with = "humantime_serde")]
    pub assertion_lifetime: Duration,

    /// Lifetime of the IdP session announced in AuthnStatement
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,

    /// NameID format for assertion subjects
    pub name_id_format: String,

    /// Deliver assertions to plain-http ACS URLs. Development only.
    pub allow_insecure_acs: bool,
}

/// Directory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DhtConfig {
    /// Expiry applied to stored values. Values never expire when unset.
    #[serde(with = "humantime_serde")]
    pub record_ttl: Option<Duration>,

    /// Maximum size of a single stored value in bytes
    pub max_value_size: usize,

    /// How often the server sweeps expired values out of the store
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8765)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            namespace: "identhub".to_string(),
            hub_namespace: "identhub-hub".to_string(),
            alias: "hub".to_string(),
            keystore_dir: None,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { default_ttl: Duration::from_secs(3600) }
    }
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            entity_id: "http://localhost:8765/saml/metadata".to_string(),
            sso_url: "http://localhost:8765/saml/sso".to_string(),
            assertion_lifetime: Duration::from_secs(300),
            session_lifetime: Duration::from_secs(8 * 3600),
            name_id_format: crate::core_saml::constants::NAMEID_FORMAT_UNSPECIFIED.to_string(),
            allow_insecure_acs: false,
        }
    }
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            record_ttl: None,
            max_value_size: 64 * 1024, // 64 KiB
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: IDENTHUB_<SECTION>_<KEY>
    /// Example: IDENTHUB_SERVER_BIND_ADDRESS=0.0.0.0:8765
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay `IDENTHUB_*` variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(addr) = env::var("IDENTHUB_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .map_err(|e| env_error("IDENTHUB_SERVER_BIND_ADDRESS", e))?;
        }

        // Identity
        if let Ok(namespace) = env::var("IDENTHUB_IDENTITY_NAMESPACE") {
            self.identity.namespace = namespace;
        }
        if let Ok(hub) = env::var("IDENTHUB_IDENTITY_HUB_NAMESPACE") {
            self.identity.hub_namespace = hub;
        }
        if let Ok(alias) = env::var("IDENTHUB_IDENTITY_ALIAS") {
            self.identity.alias = alias;
        }
        if let Ok(dir) = env::var("IDENTHUB_IDENTITY_KEYSTORE_DIR") {
            self.identity.keystore_dir = Some(PathBuf::from(dir));
        }

        // Token
        if let Ok(ttl) = env::var("IDENTHUB_TOKEN_DEFAULT_TTL") {
            self.token.default_ttl = humantime_serde::re::humantime::parse_duration(&ttl)
                .map_err(|e| env_error("IDENTHUB_TOKEN_DEFAULT_TTL", e))?;
        }

        // SAML
        if let Ok(entity_id) = env::var("IDENTHUB_SAML_ENTITY_ID") {
            self.saml.entity_id = entity_id;
        }
        if let Ok(sso_url) = env::var("IDENTHUB_SAML_SSO_URL") {
            self.saml.sso_url = sso_url;
        }
        if let Ok(lifetime) = env::var("IDENTHUB_SAML_ASSERTION_LIFETIME") {
            self.saml.assertion_lifetime = humantime_serde::re::humantime::parse_duration(&lifetime)
                .map_err(|e| env_error("IDENTHUB_SAML_ASSERTION_LIFETIME", e))?;
        }

        if let Ok(insecure) = env::var("IDENTHUB_SAML_ALLOW_INSECURE_ACS") {
            self.saml.allow_insecure_acs = insecure
                .parse()
                .map_err(|e| env_error("IDENTHUB_SAML_ALLOW_INSECURE_ACS", e))?;
        }

        // Logging
        if let Ok(level) = env::var("IDENTHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("IDENTHUB_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| env_error("IDENTHUB_LOG_JSON", e))?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "identity.namespace must not be empty".to_string(),
            ));
        }

        if self.identity.namespace.contains(':') || self.identity.hub_namespace.contains(':') {
            return Err(ConfigError::Invalid(
                "namespaces must not contain ':'".to_string(),
            ));
        }

        if self.identity.hub_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "identity.hub_namespace must not be empty".to_string(),
            ));
        }

        if self.token.default_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "token.default_ttl must be greater than 0".to_string(),
            ));
        }

        if self.saml.entity_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "saml.entity_id must not be empty".to_string(),
            ));
        }

        if self.saml.assertion_lifetime.is_zero() {
            return Err(ConfigError::Invalid(
                "saml.assertion_lifetime must be greater than 0".to_string(),
            ));
        }

        if self.saml.assertion_lifetime > MAX_ASSERTION_LIFETIME {
            return Err(ConfigError::Invalid(format!(
                "saml.assertion_lifetime must not exceed {}",
                humantime_serde::re::humantime::format_duration(MAX_ASSERTION_LIFETIME)
            )));
        }

        if self.saml.session_lifetime.is_zero()
            || self.saml.session_lifetime > MAX_SESSION_LIFETIME
        {
            return Err(ConfigError::Invalid(format!(
                "saml.session_lifetime must be between 1s and {}",
                humantime_serde::re::humantime::format_duration(MAX_SESSION_LIFETIME)
            )));
        }

        if self.dht.cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "dht.cleanup_interval must be greater than 0".to_string(),
            ));
        }

        if self.dht.max_value_size == 0 {
            return Err(ConfigError::Invalid(
                "dht.max_value_size must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<crate::logging::LogLevel>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;

        Ok(())
    }

    /// Logging setup derived from the `logging` section
    pub fn log_config(&self) -> crate::logging::LogConfig {
        let level = self.logging.level.parse().unwrap_or_default();
        crate::logging::LogConfig::new(level)
            .with_timestamp(self.logging.with_timestamp)
            .with_target(self.logging.with_target)
            .json_format(self.logging.json_format)
    }
}

fn env_error(var: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Env { var, reason: err.to_string() }
}
