/// Application context and dependency injection
use crate::{
    config::{ServerConfig, StorageConfig},
    db,
    error::ApiResult,
    proxy::DocsProxy,
    store::{MemoryStore, Repository, SqliteStore},
    telemetry::{RandomTelemetry, TelemetrySimulator},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn Repository>,
    pub telemetry: Arc<dyn TelemetrySimulator>,
    pub docs: Arc<DocsProxy>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let store: Arc<dyn Repository> = match &config.storage {
            StorageConfig::Memory => {
                tracing::info!("Using in-memory record store");
                Arc::new(MemoryStore::new())
            }
            StorageConfig::Sqlite { path } => {
                tracing::info!(path = %path.display(), "Using SQLite record store");
                let pool = db::create_pool(path, db::DatabaseOptions::default()).await?;
                db::run_migrations(&pool).await?;
                db::test_connection(&pool).await?;
                Arc::new(SqliteStore::new(pool))
            }
        };

        Self::with_parts(config, store, Arc::new(RandomTelemetry))
    }

    /// Assemble a context from already-built services
    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn Repository>,
        telemetry: Arc<dyn TelemetrySimulator>,
    ) -> ApiResult<Self> {
        let docs = Arc::new(DocsProxy::new(&config.upstream)?);

        Ok(Self {
            config: Arc::new(config),
            store,
            telemetry,
            docs,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
