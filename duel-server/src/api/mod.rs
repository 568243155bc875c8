//! HTTP/JSON API Layer
//!
//! Provides REST-like endpoints following gRPC path conventions.
//!
//! ## Architecture
//! ```text
//! Game client (polls; no push channel)
//!       ↓ HTTP POST, JSON body, x-player-id header
//! Axum Router (port 50051)
//!       ↓
//! Service Handlers (challenge, battle)
//!       ↓
//! ChallengeManager / BattleEngine
//!       ↓
//! StorageManager (PostgreSQL or in-memory)
//! ```
//!
//! ## Endpoint Convention
//! All endpoints follow gRPC path pattern: `POST /wizard.<Service>/<Method>`
//! Example: `POST /wizard.BattleService/ApplyMove`

pub mod battle;
pub mod challenge;
pub mod error;
pub mod identity;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use duel_core::BattleError;

use crate::metrics::ServerMetrics;
use crate::service::{BattleEngine, ChallengeManager, ServiceResult};
use crate::storage::StorageManager;

use self::error::ApiError;

/// Shared state available to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub challenges: ChallengeManager,
    pub engine: BattleEngine,
    /// Server-wide metrics (lock-free atomics)
    pub metrics: Arc<ServerMetrics>,
}

impl ApiState {
    pub fn new(storage: StorageManager) -> Self {
        Self {
            challenges: ChallengeManager::new(storage.clone()),
            engine: BattleEngine::new(storage),
            metrics: ServerMetrics::new(),
        }
    }
}

/// Convert a service result for the wire, counting lost races
fn track<T>(state: &ApiState, result: ServiceResult<T>) -> Result<T, ApiError> {
    result.map_err(|err| {
        if let Some(BattleError::StaleStateConflict { .. }) = err.battle() {
            state.metrics.record_stale_conflict();
        }
        ApiError::from(err)
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full API router with all service endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(crate::metrics::prometheus_handler))
        .route("/metrics/json", get(crate::metrics::json_metrics_handler))
        .merge(challenge::routes())
        .merge(battle::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP API server on the given port
///
/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn start_api_server<F>(
    storage: StorageManager,
    port: u16,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_router(ApiState::new(storage));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
