use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for `CREDENTIAL_EXPIRY_LEEWAY_SECS` and `BUNDLE_CACHE_TTL_SECS`.
pub const MAX_LIFETIME_SECS: u64 = 24 * 60 * 60;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub database_min_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub database_connection_timeout: u64,

    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_store_max_retries")]
    pub store_max_retries: u32,
    #[serde(default = "default_store_retry_initial_delay_ms")]
    pub store_retry_initial_delay_ms: u64,
    #[serde(default = "default_store_retry_max_delay_ms")]
    pub store_retry_max_delay_ms: u64,
    #[serde(default = "default_store_query_timeout_ms")]
    pub store_query_timeout_ms: u64,
    #[serde(default = "default_resolution_timeout_ms")]
    pub resolution_timeout_ms: u64,
    #[serde(default = "default_credential_expiry_leeway_secs")]
    pub credential_expiry_leeway_secs: i64,

    #[serde(default)]
    pub bundle_cache_enabled: bool,
    #[serde(default = "default_bundle_cache_ttl_secs")]
    pub bundle_cache_ttl_secs: u64,

    #[serde(default = "default_jira_api_base_url")]
    pub jira_api_base_url: String,
    #[serde(default = "default_notion_api_base_url")]
    pub notion_api_base_url: String,
    #[serde(default = "default_connector_timeout_secs")]
    pub connector_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Read-retry policy applied to every central store query.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub delay_multiplier: f64,
    pub max_delay: Duration,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_store_max_retries(),
            initial_delay: Duration::from_millis(default_store_retry_initial_delay_ms()),
            delay_multiplier: 2.0,
            max_delay: Duration::from_millis(default_store_retry_max_delay_ms()),
            attempt_timeout: Duration::from_millis(default_store_query_timeout_ms()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub retry: RetryConfig,
    pub resolution_timeout: Duration,
    pub expiry_leeway: chrono::Duration,
    pub cache: Option<BundleCacheConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            resolution_timeout: Duration::from_millis(default_resolution_timeout_ms()),
            expiry_leeway: chrono::Duration::seconds(default_credential_expiry_leeway_secs()),
            cache: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BundleCacheConfig {
    pub ttl: Duration,
}

#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    pub jira_base_url: String,
    pub notion_base_url: String,
    pub timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            jira_base_url: default_jira_api_base_url(),
            notion_base_url: default_notion_api_base_url(),
            timeout: Duration::from_secs(default_connector_timeout_secs()),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connection_timeout() -> u64 {
    1
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_store_max_retries() -> u32 {
    2
}
fn default_store_retry_initial_delay_ms() -> u64 {
    50
}
fn default_store_retry_max_delay_ms() -> u64 {
    1000
}
fn default_store_query_timeout_ms() -> u64 {
    2000
}
fn default_resolution_timeout_ms() -> u64 {
    10_000
}
fn default_credential_expiry_leeway_secs() -> i64 {
    30
}
fn default_bundle_cache_ttl_secs() -> u64 {
    60
}
fn default_jira_api_base_url() -> String {
    "https://api.atlassian.com/ex/jira".to_string()
}
fn default_notion_api_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}
fn default_connector_timeout_secs() -> u64 {
    15
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `.env` and the environment without validating server-only
    /// settings such as the JWT secret.
    pub fn load() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.database_min_connections > self.database_max_connections {
            return Err(AppError::Config(
                "DATABASE_MIN_CONNECTIONS cannot be greater than DATABASE_MAX_CONNECTIONS"
                    .to_string(),
            ));
        }

        // A pool wait longer than one query attempt strands blocking threads in `pool.get()`.
        if self.database_connection_timeout == 0
            || self.database_connection_timeout.saturating_mul(1000) >= self.store_query_timeout_ms
        {
            return Err(AppError::Config(
                "DATABASE_CONNECTION_TIMEOUT must be > 0 and shorter than STORE_QUERY_TIMEOUT_MS"
                    .to_string(),
            ));
        }

        if self.jwt_secret.trim().is_empty() {
            return Err(AppError::Config(
                "JWT_SECRET must be set to a secure value".to_string(),
            ));
        }

        if self.store_query_timeout_ms == 0 || self.resolution_timeout_ms == 0 {
            return Err(AppError::Config(
                "STORE_QUERY_TIMEOUT_MS and RESOLUTION_TIMEOUT_MS must be > 0".to_string(),
            ));
        }

        if self.store_retry_initial_delay_ms > self.store_retry_max_delay_ms {
            return Err(AppError::Config(
                "STORE_RETRY_INITIAL_DELAY_MS cannot be greater than STORE_RETRY_MAX_DELAY_MS"
                    .to_string(),
            ));
        }

        if !(0..=MAX_LIFETIME_SECS as i64).contains(&self.credential_expiry_leeway_secs) {
            return Err(AppError::Config(format!(
                "CREDENTIAL_EXPIRY_LEEWAY_SECS must be between 0 and {}",
                MAX_LIFETIME_SECS
            )));
        }

        if self.bundle_cache_enabled
            && !(1..=MAX_LIFETIME_SECS).contains(&self.bundle_cache_ttl_secs)
        {
            return Err(AppError::Config(format!(
                "BUNDLE_CACHE_TTL_SECS must be between 1 and {} when the bundle cache is enabled",
                MAX_LIFETIME_SECS
            )));
        }

        if self.connector_timeout_secs == 0 {
            return Err(AppError::Config(
                "CONNECTOR_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connection_timeout: self.database_connection_timeout,
        }
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.store_max_retries,
            initial_delay: Duration::from_millis(self.store_retry_initial_delay_ms),
            delay_multiplier: 2.0,
            max_delay: Duration::from_millis(self.store_retry_max_delay_ms),
            attempt_timeout: Duration::from_millis(self.store_query_timeout_ms),
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            retry: self.retry(),
            resolution_timeout: Duration::from_millis(self.resolution_timeout_ms),
            expiry_leeway: chrono::Duration::seconds(
                self.credential_expiry_leeway_secs
                    .clamp(0, MAX_LIFETIME_SECS as i64),
            ),
            cache: self.bundle_cache_enabled.then(|| BundleCacheConfig {
                ttl: Duration::from_secs(self.bundle_cache_ttl_secs),
            }),
        }
    }

    pub fn connectors(&self) -> ConnectorConfig {
        ConnectorConfig {
            jira_base_url: self.jira_api_base_url.clone(),
            notion_base_url: self.notion_api_base_url.clone(),
            timeout: Duration::from_secs(self.connector_timeout_secs),
        }
    }
}
