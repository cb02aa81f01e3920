//! # famlink-api — HTTP Service for Family Links
//!
//! Axum routes over the [`LifecycleEngine`](famlink_engine::LifecycleEngine).
//!
//! ## API Surface
//!
//! | Prefix | Module | Purpose |
//! |---|---|---|
//! | `/v1/links/*` | [`routes::links`] | request, decide, remove, per-pair reads |
//! | `/v1/sponsors/*` | [`routes::accounts`] | a sponsor's members and outgoing requests |
//! | `/v1/members/*` | [`routes::accounts`] | a member's sponsors and incoming requests |
//! | `/openapi.json` | [`openapi`] | generated OpenAPI document |
//! | `/metrics` | | Prometheus exposition, when a recorder is installed |
//! | `/health/*` | | liveness and readiness probes |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → metrics_middleware → Handler
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::links::router())
        .merge(routes::accounts::router())
        .merge(openapi::router())
        .route("/metrics", get(prometheus_metrics))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe. Always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when a configured database does not answer.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, (StatusCode, String)> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed");
            return Err((StatusCode::SERVICE_UNAVAILABLE, "database unavailable".to_string()));
        }
    }
    Ok("ready")
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound("metrics recorder not installed".to_string()))
}
