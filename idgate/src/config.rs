//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (prefix: IDGATE_)
//! 2. Config file: ./config.toml (or an explicit path)
//! 3. Default values
//!
//! Provider settings are immutable after startup: every flow step borrows the
//! configuration built here, and a missing field is a fatal startup error
//! rather than something to retry at runtime.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// OAuth provider configuration
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Session token configuration
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Frontend redirect configuration
    #[serde(default)]
    pub frontend: FrontendConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            environment: default_environment(),
        }
    }
}

/// OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// CSRF state TTL in seconds (default: 600 = 10 min)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: u64,

    /// Timeout for outbound provider calls in seconds (default: 10)
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Configured providers, keyed by provider name ("google", "naver")
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: default_state_ttl(),
            http_timeout_secs: default_http_timeout(),
            providers: HashMap::new(),
        }
    }
}

/// Individual OAuth provider configuration
///
/// All six core fields must be non-empty before any flow step runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OAuth client ID
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,

    /// Authorization (consent screen) endpoint
    #[serde(default)]
    pub authorize_uri: String,

    /// Token endpoint
    #[serde(default)]
    pub token_uri: String,

    /// Userinfo endpoint
    #[serde(default)]
    pub userinfo_uri: String,

    /// OAuth scopes to request (provider defaults apply when empty)
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// Validate that every required field is present
    ///
    /// Returns a `ConfigError` naming the first missing field. Called at
    /// provider construction so no flow step can run against a partial
    /// configuration.
    pub fn validate(&self, provider: &str) -> Result<()> {
        let fields = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("authorize_uri", &self.authorize_uri),
            ("token_uri", &self.token_uri),
            ("userinfo_uri", &self.userinfo_uri),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::config(format!(
                    "oauth provider '{provider}': missing required field '{name}'"
                )));
            }
        }
        Ok(())
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Path to the signing secret file (raw bytes, loaded once at startup)
    #[serde(default = "default_signing_key_path")]
    pub signing_key_path: PathBuf,

    /// Access token lifetime in seconds (default: 900 = 15 min)
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,

    /// Clock-skew leeway applied during verification, in seconds (default: 30)
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,

    /// Issuer claim
    #[serde(default)]
    pub issuer: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing_key_path: default_signing_key_path(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            clock_skew_secs: default_clock_skew(),
            issuer: None,
        }
    }
}

/// Frontend redirect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Base URL the callback redirects to, on both success and failure
    #[serde(default = "default_frontend_redirect")]
    pub redirect_url: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            redirect_url: default_frontend_redirect(),
        }
    }
}

impl Config {
    /// Load configuration from ./config.toml and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file
    ///
    /// Useful for testing or non-standard deployments.
    pub fn load_from(path: &str) -> Result<Self> {
        let config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Load from config file (if exists)
            .merge(Toml::file(path))
            // Override with environment variables
            .merge(Env::prefixed("IDGATE_").split("_"))
            .extract()?;

        Ok(config)
    }

    /// Validate the fields the login flow depends on
    ///
    /// Fails fast on an empty provider table, a partial provider entry, or a
    /// missing frontend redirect. Secrets are never defaulted.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.providers.is_empty() {
            return Err(Error::config("no oauth providers configured"));
        }
        for (key, provider) in &self.oauth.providers {
            provider.validate(key)?;
        }
        if self.frontend.redirect_url.trim().is_empty() {
            return Err(Error::config("frontend.redirect_url must not be empty"));
        }
        Ok(())
    }
}

// Default value functions

fn default_service_name() -> String {
    "idgate".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_state_ttl() -> u64 {
    600 // 10 minutes
}

fn default_http_timeout() -> u64 {
    10
}

fn default_signing_key_path() -> PathBuf {
    PathBuf::from("session.key")
}

fn default_access_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_ttl() -> i64 {
    604800 // 7 days
}

fn default_clock_skew() -> u64 {
    30
}

fn default_frontend_redirect() -> String {
    "http://localhost:3000/oauth/callback".to_string()
}
