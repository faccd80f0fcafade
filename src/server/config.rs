//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! With no file found, built-in defaults apply.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::SessionConfig;
use crate::{HuginnError, Result};

/// Environment variable consulted when no secrets file sets a JWT secret.
pub const JWT_SECRET_ENV: &str = "HUGINN_JWT_SECRET";

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub upstream: UpstreamSection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Prompt-test session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Keep-alive window in seconds (default: 60).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Lifetime of per-session upstream credentials (default: 60).
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl_secs: u64,
    /// Upstream events buffered per session (default: 64).
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive(),
            credential_ttl_secs: default_credential_ttl(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl SessionSection {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .keepalive(Duration::from_secs(self.keepalive_secs))
            .stream_buffer(self.stream_buffer)
    }

    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl_secs)
    }
}

fn default_keepalive() -> u64 {
    60
}

fn default_credential_ttl() -> u64 {
    60
}

fn default_stream_buffer() -> usize {
    64
}

/// Cache store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Redis URL. Without one, an in-process store is used.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Optional key namespace for the shared store.
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Capacity of the in-process store (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// TTL of cached request configurations (default: 1800).
    #[serde(default = "default_request_config_ttl")]
    pub request_config_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: None,
            max_entries: default_max_entries(),
            request_config_ttl_secs: default_request_config_ttl(),
        }
    }
}

impl CacheSection {
    pub fn request_config_ttl(&self) -> Duration {
        Duration::from_secs(self.request_config_ttl_secs)
    }
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_request_config_ttl() -> u64 {
    30 * 60
}

/// Backend prompt-testing service.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSection {
    /// gRPC endpoint (default: http://127.0.0.1:50051).
    #[serde(default = "default_upstream_address")]
    pub address: String,
    /// Connect timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            address: default_upstream_address(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl UpstreamSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_upstream_address() -> String {
    "http://127.0.0.1:50051".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub jwt: Option<JwtSecret>,
}

/// Signing secret for session credentials.
#[derive(Clone, Deserialize)]
pub struct JwtSecret {
    pub secret: String,
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSecret")
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    /// 4. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.huginn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/huginn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (env vars may be used).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// JWT signing secret, falling back to `HUGINN_JWT_SECRET`.
    pub fn jwt_secret(&self) -> Option<String> {
        self.jwt
            .as_ref()
            .map(|jwt| jwt.secret.clone())
            .filter(|secret| !secret.is_empty())
            .or_else(|| std::env::var(JWT_SECRET_ENV).ok().filter(|s| !s.is_empty()))
    }
}
