/// Configuration management for the Battery OS API
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Which record store backs the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Process-local maps, lost on restart
    Memory,
    /// SQLite database file
    Sqlite { path: PathBuf },
}

/// External documentation and health service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL serving /docs, /redoc and /openapi.json
    pub docs_url: String,
    /// Base URL serving /health
    pub health_url: String,
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: StorageConfig::Memory,
            upstream: UpstreamConfig {
                docs_url: "http://0.0.0.0:8000".to_string(),
                health_url: "http://0.0.0.0:5001".to_string(),
                timeout_secs: 10,
            },
            logging: LoggingConfig {
                filter: "battery_os=debug,tower_http=debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let hostname = lookup("BATTERY_OS_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = match lookup("BATTERY_OS_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::Config(format!("Invalid port number: {}", raw)))?,
            None => defaults.service.port,
        };

        let storage = match lookup("BATTERY_OS_STORAGE").as_deref() {
            None | Some("memory") => StorageConfig::Memory,
            Some("sqlite") => StorageConfig::Sqlite {
                path: lookup("BATTERY_OS_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/battery-os.sqlite")),
            },
            Some(other) => {
                return Err(ApiError::Config(format!(
                    "Unknown storage backend '{}', expected 'memory' or 'sqlite'",
                    other
                )))
            }
        };

        let docs_url = lookup("BATTERY_OS_DOCS_URL").unwrap_or(defaults.upstream.docs_url);
        let health_url = lookup("BATTERY_OS_HEALTH_URL").unwrap_or(defaults.upstream.health_url);
        let timeout_secs = match lookup("BATTERY_OS_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::Config(format!("Invalid upstream timeout: {}", raw)))?,
            None => defaults.upstream.timeout_secs,
        };

        let filter = lookup("RUST_LOG").unwrap_or(defaults.logging.filter);
        let format = match lookup("BATTERY_OS_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage,
            upstream: UpstreamConfig {
                docs_url: docs_url.trim_end_matches('/').to_string(),
                health_url: health_url.trim_end_matches('/').to_string(),
                timeout_secs,
            },
            logging: LoggingConfig { filter, format },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Config("Hostname cannot be empty".to_string()));
        }

        for url in [&self.upstream.docs_url, &self.upstream.health_url] {
            reqwest::Url::parse(url)
                .map_err(|e| ApiError::Config(format!("Invalid upstream URL {}: {}", url, e)))?;
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ApiError::Config(
                "Upstream timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    /// Address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}
