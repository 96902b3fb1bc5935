//! Configuration for the auth server.
//!
//! Sources, later ones taking precedence:
//! - Built-in defaults
//! - Configuration file (`config.toml`, or the path in `CADENCE_CONFIG_FILE`)
//! - Environment variables with the `CADENCE` prefix, e.g. `CADENCE__OIDC__CLIENT_ID`.
//!   `CADENCE__OIDC__SCOPES` takes a space separated list, `"openid email"`.
//!
//! The validated value is handed to each component at construction; nothing
//! reads configuration from global state.

use anyhow::{Context, Result};
use cadence_identity_oidc::{OidcConfig, OidcProviderConfig, default_scopes};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const CONFIG_FILE_ENV: &str = "CADENCE_CONFIG_FILE";
pub const ENV_PREFIX: &str = "CADENCE";

/// One year
const MAX_SESSION_EXPIRY: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oidc: OidcSettings,
    pub session: SessionSettings,
    pub frontend: FrontendConfig,
    pub logging: LoggingConfig,
}

/// Server network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

/// Identity provider client registration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcSettings {
    pub provider_id: String,
    /// Issuer base URL; `/oidc` is appended when missing
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the provider, pointing at `/callback`
    pub callback_url: String,
    /// Where the provider sends the browser after logout. Defaults to the
    /// frontend URL when empty.
    pub post_logout_redirect_uri: String,
    pub scopes: Vec<String>,
    pub http_timeout_seconds: u64,
    pub metadata_ttl_seconds: u64,
    pub flow_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Send the cookie over HTTPS only
    pub secure: bool,
    /// Inactivity period after which the session expires
    pub expiry_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Where a successful callback redirects the browser
    pub url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

impl Default for OidcSettings {
    fn default() -> Self {
        Self {
            provider_id: "oidc".to_string(),
            endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            post_logout_redirect_uri: String::new(),
            scopes: default_scopes(),
            http_timeout_seconds: 30,
            metadata_ttl_seconds: 300,
            flow_timeout_seconds: 30,
        }
    }
}

// The client secret never reaches logs.
impl std::fmt::Debug for OidcSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSettings")
            .field("provider_id", &self.provider_id)
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("post_logout_redirect_uri", &self.post_logout_redirect_uri)
            .field("scopes", &self.scopes)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("metadata_ttl_seconds", &self.metadata_ttl_seconds)
            .field("flow_timeout_seconds", &self.flow_timeout_seconds)
            .finish()
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "cadence_session".to_string(),
            secure: false,
            expiry_seconds: 86400, // 24 hours
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__") // CADENCE__OIDC__CLIENT_ID
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("oidc.scopes")
}

impl Config {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        Self::build(config_path, environment())
    }

    fn build(config_path: &Path, env: Environment) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if config_path.exists() {
            info!("Loading configuration from {}", config_path.display());
            builder = builder.add_source(File::from(config_path));
        } else {
            debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
        }

        builder = builder.add_source(env);

        let config = builder.build().context("Failed to build configuration")?;

        let settings: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        // Provider settings have no usable defaults.
        let oidc = &self.oidc;
        for (name, value) in [
            ("oidc.endpoint", &oidc.endpoint),
            ("oidc.client_id", &oidc.client_id),
            ("oidc.client_secret", &oidc.client_secret),
            ("oidc.callback_url", &oidc.callback_url),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must be set", name);
            }
        }

        Url::parse(oidc.endpoint.trim()).context("oidc.endpoint is not a valid URL")?;
        Url::parse(&oidc.callback_url).context("oidc.callback_url is not a valid URL")?;
        if !oidc.post_logout_redirect_uri.is_empty() {
            Url::parse(&oidc.post_logout_redirect_uri)
                .context("oidc.post_logout_redirect_uri is not a valid URL")?;
        }
        Url::parse(&self.frontend.url).context("frontend.url is not a valid URL")?;

        if oidc.http_timeout_seconds == 0 || oidc.flow_timeout_seconds == 0 {
            anyhow::bail!("OIDC timeouts must be greater than 0");
        }

        if self.session.cookie_name.trim().is_empty() {
            anyhow::bail!("session.cookie_name cannot be empty");
        }
        if self.session.expiry_seconds == 0 || self.session.expiry_seconds > MAX_SESSION_EXPIRY {
            anyhow::bail!(
                "session.expiry_seconds must be between 1 and {}",
                MAX_SESSION_EXPIRY
            );
        }

        // A full filter directive is passed through to EnvFilter as-is.
        if !self.logging.level.contains('=') && !self.logging.level.contains(',') {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            let level_lower = self.logging.level.to_lowercase();
            if !valid_levels.contains(&level_lower.as_str()) {
                anyhow::bail!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level,
                    valid_levels
                );
            }
        }

        let valid_formats = ["pretty", "json", "compact"];
        let format_lower = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format_lower.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.level.contains('=') || self.logging.level.contains(',') {
            self.logging.level.clone()
        } else {
            let level = self.logging.level.to_lowercase();
            format!(
                "cadence_auth_server={level},cadence_identity_session={level},cadence_identity_oidc={level},cadence_identity_local={level},tower_http={level},warn"
            )
        }
    }

    pub fn flow_timeout(&self) -> Duration {
        Duration::from_secs(self.oidc.flow_timeout_seconds)
    }

    pub fn post_logout_redirect_uri(&self) -> &str {
        if self.oidc.post_logout_redirect_uri.is_empty() {
            &self.frontend.url
        } else {
            &self.oidc.post_logout_redirect_uri
        }
    }

    /// Provider configuration for the OIDC client.
    pub fn oidc_config(&self) -> OidcConfig {
        let provider = OidcProviderConfig {
            provider_id: self.oidc.provider_id.clone(),
            ..OidcProviderConfig::new(
                self.oidc.endpoint.trim(),
                self.oidc.client_id.clone(),
                self.oidc.client_secret.clone(),
                self.oidc.callback_url.clone(),
                self.post_logout_redirect_uri(),
            )
        }
        .with_scopes(self.oidc.scopes.clone());

        OidcConfig::new(provider)
            .with_http_timeout(self.oidc.http_timeout_seconds)
            .with_metadata_ttl(self.oidc.metadata_ttl_seconds)
    }
}
