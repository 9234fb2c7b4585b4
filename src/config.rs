// Configuration management

use crate::core::errors::RelayError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Which of the three services this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Requester,
    Transfer,
    CapabilityServer,
}

impl Role {
    pub fn default_port(&self) -> u16 {
        match self {
            Role::Requester => 8000,
            Role::Transfer => 8001,
            Role::CapabilityServer => 8002,
        }
    }

    pub fn service_name(&self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Transfer => "transfer-endpoint",
            Role::CapabilityServer => "capability-server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// Application configuration loaded from environment variables
///
/// One struct serves all roles; each role reads the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub role: Role,

    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Where the requester reaches the capability server
    pub capability_server_url: String,

    // Transfer endpoint URL handed out by the capability server
    pub transfer_endpoint_url: String,

    // Transfer endpoint storage
    pub upload_dir: PathBuf,

    // Per-hop timeout for requester -> capability server calls
    pub hop_timeout_secs: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration for `role` from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env(role: Role) -> Result<Self, RelayError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // file may not exist
        }

        let config = Self {
            role,
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port(role.default_port())?,
            capability_server_url: Self::url_or_local("MCP_SERVER_URL", "MCP_SERVER_PORT", "8002", "/mcp"),
            transfer_endpoint_url: Self::url_or_local("FILE_API_URL", "FILE_API_PORT", "8001", "/upload"),
            upload_dir: PathBuf::from(Self::get_env_or_default("UPLOAD_DIR", "uploads")),
            hop_timeout_secs: Self::parse_u64_or_default("HOP_TIMEOUT_SECS", 10)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 2 * 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "text"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> String {
        match env::var(key) {
            Ok(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// Explicit URL wins; otherwise `http://localhost:{port}{path}`
    fn url_or_local(url_key: &str, port_key: &str, default_port: &str, path: &str) -> String {
        match env::var(url_key) {
            Ok(url) if !url.is_empty() => url,
            _ => format!(
                "http://localhost:{}{}",
                Self::get_env_or_default(port_key, default_port),
                path
            ),
        }
    }

    /// Parse port from PORT environment variable
    fn parse_port(default: u16) -> Result<u16, RelayError> {
        let port_str = match env::var("PORT") {
            Ok(value) => value,
            Err(_) => return Ok(default),
        };
        let port = port_str.parse::<u16>().map_err(|e| {
            RelayError::ConfigurationError(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(RelayError::ConfigurationError(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, RelayError> {
        match env::var(key) {
            Ok(value) => Self::parse_positive::<u64>(key, &value),
            _ => Ok(default),
        }
    }

    /// Parse usize from environment variable or return default
    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, RelayError> {
        match env::var(key) {
            Ok(value) => Self::parse_positive::<usize>(key, &value),
            _ => Ok(default),
        }
    }

    fn parse_positive<T>(key: &str, value: &str) -> Result<T, RelayError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: fmt::Display,
    {
        let parsed = value.parse::<T>().map_err(|e| {
            RelayError::ConfigurationError(format!("Invalid {} value '{}': {}", key, value, e))
        })?;

        if parsed == T::default() {
            return Err(RelayError::ConfigurationError(format!(
                "{} must be greater than 0",
                key
            )));
        }

        Ok(parsed)
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), RelayError> {
        match self.role {
            Role::Requester => Self::validate_url(&self.capability_server_url, "MCP server")?,
            Role::CapabilityServer => Self::validate_url(&self.transfer_endpoint_url, "File API")?,
            Role::Transfer => {
                if self.upload_dir.as_os_str().is_empty() {
                    return Err(RelayError::ConfigurationError("UPLOAD_DIR is empty".to_string()));
                }
            }
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, description: &str) -> Result<(), RelayError> {
        let parsed = url::Url::parse(url).map_err(|e| {
            RelayError::ConfigurationError(format!("Invalid {} URL '{}': {}", description, url, e))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RelayError::ConfigurationError(format!(
                "Invalid {} URL '{}': scheme must be http or https",
                description, url
            )));
        }
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), RelayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(RelayError::ConfigurationError(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), RelayError> {
        if format != "json" && format != "text" {
            return Err(RelayError::ConfigurationError(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// Bypasses environment variable loading and validation.
    pub fn test_config(role: Role) -> Self {
        Self {
            role,
            bind_address: "127.0.0.1".to_string(),
            port: role.default_port(),
            capability_server_url: "http://localhost:8002/mcp".to_string(),
            transfer_endpoint_url: "http://endpoint/upload".to_string(),
            upload_dir: PathBuf::from("uploads"),
            hop_timeout_secs: 5,
            request_timeout_secs: 30,
            body_size_limit_bytes: 2 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
