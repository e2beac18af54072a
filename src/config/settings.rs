//! Configuration settings structures for cadence-rs
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "cadence-rs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_keep_alive_timeout() -> u64 {
    75
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_publish_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_seconds() -> u64 {
    30
}

fn default_backoff_max_seconds() -> u64 {
    3600
}

fn default_flow_key() -> String {
    "email-provider".to_string()
}

fn default_flow_rate() -> u32 {
    10
}

fn default_flow_parallelism() -> u32 {
    2
}

fn default_issuer() -> String {
    "dispatch-queue".to_string()
}

fn default_true() -> bool {
    true
}

fn default_reconcile_cron() -> String {
    // six-field cron with seconds
    "0 */10 * * * *".to_string()
}

fn default_recalculate_cron() -> String {
    "30 */10 * * * *".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout: u64,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            keep_alive_timeout: default_keep_alive_timeout(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (postgres://...)
    #[serde(default)]
    pub url: String,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation("database.url", "must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                "must not exceed max_connections",
            ));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

// ============================================================================
// Logger Configuration
// ============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Tracing subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Log level filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ============================================================================
// Queue Configuration
// ============================================================================

/// Contract with the external delayed-message queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Base URL of the queue's publish API
    #[serde(default)]
    pub url: String,

    /// Delivery worker endpoint the queue posts envelopes to when a message
    /// fires
    #[serde(default)]
    pub worker_url: String,

    /// Public base URL of this service, used to build the callback URLs
    #[serde(default)]
    pub callback_base_url: String,

    /// Timeout for publish/cancel calls in seconds
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_seconds: u64,

    /// Retry attempts the queue makes before the failure callback fires
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base of the exponential backoff between queue retries, seconds
    #[serde(default = "default_backoff_base_seconds")]
    pub backoff_base_seconds: u64,

    /// Ceiling for the backoff, seconds
    #[serde(default = "default_backoff_max_seconds")]
    pub backoff_max_seconds: u64,

    /// Flow-control key shared by every message headed to the email provider
    #[serde(default = "default_flow_key")]
    pub flow_key: String,

    /// Flow-control rate: messages per second the queue may release
    #[serde(default = "default_flow_rate")]
    pub flow_rate: u32,

    /// Flow-control parallelism: concurrent in-flight deliveries
    #[serde(default = "default_flow_parallelism")]
    pub flow_parallelism: u32,
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation("queue.url", "must not be empty"));
        }
        if self.worker_url.is_empty() {
            return Err(ConfigError::validation(
                "queue.worker_url",
                "must not be empty",
            ));
        }
        if self.callback_base_url.is_empty() {
            return Err(ConfigError::validation(
                "queue.callback_base_url",
                "must not be empty",
            ));
        }
        if self.flow_rate == 0 {
            return Err(ConfigError::validation(
                "queue.flow_rate",
                "must be greater than 0",
            ));
        }
        if self.flow_parallelism == 0 {
            return Err(ConfigError::validation(
                "queue.flow_parallelism",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            worker_url: String::new(),
            callback_base_url: String::new(),
            publish_timeout_seconds: default_publish_timeout(),
            retries: default_retries(),
            backoff_base_seconds: default_backoff_base_seconds(),
            backoff_max_seconds: default_backoff_max_seconds(),
            flow_key: default_flow_key(),
            flow_rate: default_flow_rate(),
            flow_parallelism: default_flow_parallelism(),
        }
    }
}

// ============================================================================
// Signing Configuration
// ============================================================================

/// Webhook signing keys for callback verification.
///
/// Two keys are accepted so the queue side can rotate without downtime: the
/// freshly issued key goes into `next_key`, then gets promoted to
/// `current_key` once the rotation completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Active signing key
    #[serde(default)]
    pub current_key: String,

    /// Next signing key, accepted during rotation
    #[serde(default)]
    pub next_key: Option<String>,

    /// Expected issuer claim on callback tokens
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// When true, unsigned callbacks are rejected; outside strict mode a
    /// missing signature is tolerated for local development
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl SigningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.current_key.is_empty() {
            return Err(ConfigError::validation(
                "signing.current_key",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            current_key: String::new(),
            next_key: None,
            issuer: default_issuer(),
            strict: true,
        }
    }
}

// ============================================================================
// Maintenance Configuration
// ============================================================================

/// Periodic repair jobs configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether the in-process maintenance scheduler runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression (with seconds) for the unpublished-job reconcile sweep
    #[serde(default = "default_reconcile_cron")]
    pub reconcile_cron: String,

    /// Cron expression (with seconds) for the active-batch recalculation
    #[serde(default = "default_recalculate_cron")]
    pub recalculate_cron: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_cron: default_reconcile_cron(),
            recalculate_cron: default_recalculate_cron(),
        }
    }
}

// ============================================================================
// Settings root
// ============================================================================

/// Root settings object assembled by the `ConfigLoader`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Settings {
    /// Validates all sections; called by the loader before the settings are
    /// handed to the application.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation("server.port", "must not be 0"));
        }
        self.database.validate()?;
        self.queue.validate()?;
        self.signing.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/cadence".to_string();
        settings.queue.url = "https://queue.internal".to_string();
        settings.queue.worker_url = "https://worker.internal/deliver".to_string();
        settings.queue.callback_base_url = "https://cadence.internal".to_string();
        settings.signing.current_key = "sig_current".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass_validation() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_missing_database_url_rejected() {
        let mut settings = valid_settings();
        settings.database.url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_signing_key_rejected() {
        let mut settings = valid_settings();
        settings.signing.current_key = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_flow_rate_rejected() {
        let mut settings = valid_settings();
        settings.queue.flow_rate = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_min_connections_exceeding_max_rejected() {
        let mut settings = valid_settings();
        settings.database.min_connections = 50;
        settings.database.max_connections = 10;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_server_address_formatting() {
        let settings = valid_settings();
        assert_eq!(settings.server.address(), "127.0.0.1:3000");
    }
}
