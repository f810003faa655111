//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::IntakeConfig;
use crate::db::PgScanCache;
use crate::error::AppError;
use crate::pipeline::ScanPipeline;
use crate::providers::{KicksDbClient, UpcItemDbClient};
use crate::resolution::Resolver;

/// The production pipeline: `PostgreSQL` scan cache, UPCitemdb, KicksDB.
pub type IntakePipeline = ScanPipeline<PgScanCache, UpcItemDbClient, KicksDbClient>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: IntakeConfig,
    pool: PgPool,
    pipeline: IntakePipeline,
}

impl AppState {
    /// Build state from configuration and an open pool.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if a provider client cannot be built.
    pub fn new(config: IntakeConfig, pool: PgPool) -> Result<Self, AppError> {
        let registry = UpcItemDbClient::new(&config.upcitemdb)
            .map_err(|e| AppError::Internal(format!("UPCitemdb client: {e}")))?;
        let marketplace = KicksDbClient::new(&config.kicksdb)
            .map_err(|e| AppError::Internal(format!("KicksDB client: {e}")))?;
        let resolver = Resolver::new(PgScanCache::new(pool.clone()), registry, marketplace)
            .with_provider_timeout(config.provider_timeout);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                pipeline: ScanPipeline::new(resolver),
            }),
        })
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &IntakeConfig {
        &self.inner.config
    }

    /// Database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The scan pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &IntakePipeline {
        &self.inner.pipeline
    }
}
