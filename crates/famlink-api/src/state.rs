//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The in-memory link store is authoritative for a running process. When a
//! database pool is present, each committed link is written through to
//! PostgreSQL and the store is rebuilt from it at startup. A transition
//! only notifies anyone once that write has succeeded; a failed write is
//! reverted in memory.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use famlink_adapters::{DirectoryAdapter, NotifierAdapter};
use famlink_core::Clock;
use famlink_engine::{LifecycleEngine, LinkCommand};
use famlink_state::{FamilyLink, PolicyError};
use famlink_store::InMemoryLinkStore;

use crate::config::AppConfig;
use crate::error::AppError;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    /// The store behind `engine`, kept for startup hydration.
    pub links: InMemoryLinkStore,
    /// PostgreSQL pool for write-through durability. `None` in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,
    /// Prometheus recorder handle, when one has been installed.
    pub metrics: Option<PrometheusHandle>,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("links", &self.links.len())
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// Build the engine over a fresh in-memory store.
    pub fn new(
        config: AppConfig,
        directory: Arc<dyn DirectoryAdapter>,
        notifier: Arc<dyn NotifierAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let links = InMemoryLinkStore::new();
        let engine = LifecycleEngine::new(
            Arc::new(links.clone()),
            directory,
            notifier,
            clock,
            config.engine_config(),
        )?;
        Ok(Self {
            engine: Arc::new(engine),
            links,
            db_pool: None,
            metrics: None,
            config,
        })
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Load every persisted link into the in-memory store.
    ///
    /// No-op without a pool. Returns the number of records loaded.
    pub async fn hydrate_from_db(&self) -> Result<usize, String> {
        let Some(pool) = &self.db_pool else {
            return Ok(0);
        };

        let links = crate::db::links::load_all(pool)
            .await
            .map_err(|e| format!("failed to load family links: {e}"))?;
        let active = links.iter().filter(|link| link.is_active).count();
        let loaded = self.links.hydrate(links);

        tracing::info!(loaded, active, "hydrated link store from database");
        Ok(loaded)
    }

    /// Run a lifecycle mutation end to end.
    ///
    /// The engine commits in memory, the link is written through, and only
    /// then is the notification sent. If the write-through fails the
    /// in-memory transition is reverted and the caller gets a 500.
    pub async fn execute(&self, command: LinkCommand) -> Result<FamilyLink, AppError> {
        let committed = self.engine.commit(&command)?;
        if let Err(err) = self.persist(committed.link()).await {
            let link_id = committed.link().id;
            if let Err(revert_err) = self.engine.revert(committed) {
                tracing::error!(%link_id, error = %revert_err, "failed to revert unpersisted link");
            }
            return Err(err);
        }
        Ok(self.engine.publish(committed))
    }

    /// Write a committed link through to the database, if one is configured.
    pub async fn persist(&self, link: &FamilyLink) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        match crate::db::links::upsert(pool, link).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(link_id = %link.id, version = link.version, "newer row already persisted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(link_id = %link.id, error = %e, "failed to persist link");
                Err(AppError::Internal(format!("link persistence failed: {e}")))
            }
        }
    }
}
