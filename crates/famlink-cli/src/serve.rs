//! # Serve Subcommand
//!
//! Loads configuration, wires the engine to its collaborators, hydrates
//! from the database when one is configured and serves HTTP until
//! interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;

use famlink_adapters::{InMemoryDirectory, TracingNotifier};
use famlink_api::config::{AppConfig, LogFormat};
use famlink_api::state::AppState;
use famlink_core::SystemClock;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// YAML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Port to listen on. Overrides the file and `FAMLINK_PORT`.
    #[arg(long)]
    pub port: Option<u16>,

    /// `text` or `json`. Overrides the file and `FAMLINK_LOG_FORMAT`.
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

impl ServeArgs {
    /// Apply command-line flags on top of an already layered configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }

    /// Defaults, file, environment, then flags.
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }
}

fn load_directory(config: &AppConfig) -> anyhow::Result<InMemoryDirectory> {
    match &config.accounts_file {
        Some(path) => InMemoryDirectory::load_file(path)
            .with_context(|| format!("loading accounts from {}", path.display())),
        None => {
            tracing::warn!("no accounts file configured; every directory lookup will miss");
            Ok(InMemoryDirectory::new())
        }
    }
}

/// Run the service until Ctrl-C.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(config = ?config, "starting famlink");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let directory = load_directory(&config)?;
    let db_pool = famlink_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("database initialization failed")?;

    let port = config.port;
    let mut state = AppState::new(
        config,
        Arc::new(directory),
        Arc::new(TracingNotifier),
        Arc::new(SystemClock),
    )?
    .with_metrics(metrics);
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }

    state
        .hydrate_from_db()
        .await
        .map_err(anyhow::Error::msg)
        .context("database hydration failed")?;

    let app = famlink_api::app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "famlink API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("famlink stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
