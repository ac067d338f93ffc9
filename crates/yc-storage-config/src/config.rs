// crates/yc-storage-config/src/config.rs
// ============================================================================
// Module: YC Storage Configuration
// Description: Configuration loading and validation for the storage MCP server.
// Purpose: Provide strict config parsing with hard limits and env credentials.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from an optional TOML file with strict size and
//! path limits. When no file is named and the default file is absent, the
//! built-in defaults are used. Storage credentials never live in the file;
//! they are resolved from environment variables named by the config.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "yc-storage-mcp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "YC_STORAGE_MCP_CONFIG";
/// Yandex Cloud Object Storage endpoint.
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.yandexcloud.net";
/// Yandex Cloud Object Storage region.
pub const DEFAULT_STORAGE_REGION: &str = "ru-central1";
/// Environment variable holding the access key identifier.
pub const DEFAULT_ACCESS_KEY_ENV: &str = "YANDEX_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const DEFAULT_SECRET_KEY_ENV: &str = "YANDEX_SECRET_ACCESS_KEY";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of an environment variable name.
const MAX_ENV_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Storage MCP server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageMcpConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Object storage connection configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl StorageMcpConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// An explicit path (argument or `YC_STORAGE_MCP_CONFIG`) must exist. The
    /// default `yc-storage-mcp.toml` is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http transport requires bind address".to_string(),
                    ));
                }
                let _: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not accept a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

impl ServerTransport {
    /// Returns a stable label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Audit logging configuration for tool calls and lifecycle events.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines). Defaults to stderr.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Object storage connection configuration.
///
/// # Invariants
/// - `endpoint` carries an explicit `https://` scheme unless `allow_http` is set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// S3-compatible endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Force path-style addressing.
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Environment variable name for the access key identifier.
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,
    /// Environment variable name for the secret access key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            force_path_style: default_force_path_style(),
            allow_http: false,
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

impl StorageConfig {
    /// Validates storage connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when storage settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "storage.endpoint must include http:// or https://".to_string(),
            ));
        }
        if endpoint.starts_with("http://") && !self.allow_http {
            return Err(ConfigError::Invalid(
                "storage.endpoint uses http:// without allow_http".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.region must be set".to_string()));
        }
        validate_env_name("storage.access_key_env", &self.access_key_env)?;
        validate_env_name("storage.secret_key_env", &self.secret_key_env)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Static storage credentials resolved from the environment.
///
/// # Invariants
/// - Both values are non-empty after resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl StorageCredentials {
    /// Resolves credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is missing or empty.
    pub fn from_env(config: &StorageConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(config, |name| env::var(name).ok())
    }

    /// Resolves credentials through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is missing or empty.
    pub fn from_lookup<F>(config: &StorageConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = required_env(&lookup, &config.access_key_env)?;
        let secret_access_key = required_env(&lookup, &config.secret_key_env)?;
        Ok(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns the path and whether it was named explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-valued config field.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(value).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_ENV_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} must be 1-{MAX_ENV_NAME_LENGTH} bytes")));
    }
    if !value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
        return Err(ConfigError::Invalid(format!(
            "{field} must contain only ASCII letters, digits, or underscores"
        )));
    }
    Ok(())
}

/// Reads a required, non-empty environment value.
fn required_env<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ConfigError::Invalid(format!("environment variable {name} is empty"))),
        None => Err(ConfigError::Invalid(format!("environment variable {name} is not set"))),
    }
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default storage endpoint.
fn default_endpoint() -> String {
    DEFAULT_STORAGE_ENDPOINT.to_string()
}

/// Default storage region.
fn default_region() -> String {
    DEFAULT_STORAGE_REGION.to_string()
}

/// Path-style addressing is required by the Yandex endpoint.
const fn default_force_path_style() -> bool {
    true
}

/// Default access key variable name.
fn default_access_key_env() -> String {
    DEFAULT_ACCESS_KEY_ENV.to_string()
}

/// Default secret key variable name.
fn default_secret_key_env() -> String {
    DEFAULT_SECRET_KEY_ENV.to_string()
}
