//! HTTP API for health checks and swap status
//!
//! Read-only surface: swaps are initiated through the library API, not over
//! HTTP. Status responses come from the resolver's in-memory store and never
//! include secret material.

use crate::config::ApiConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::Resolver;
use crate::swap::SwapId;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/status", get(get_status))
        .route("/swaps/:id", get(get_swap))
        .with_state(AppState { resolver })
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, resolver: Arc<Resolver>) -> ResolverResult<()> {
    let app = router(resolver);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ResolverError::Config(format!("failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ResolverError::Internal(e.to_string()))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - verify both chain connections
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.resolver.health().await;
    let chains_ok = snapshot.chains.iter().all(|c| c.healthy);
    let ready = snapshot.is_running && chains_ok;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready,
            running: snapshot.is_running,
            chains: snapshot.chains,
        }),
    )
}

/// Get resolver status
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.resolver.health().await)
}

/// Get one swap's status snapshot
async fn get_swap(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let swap_id: SwapId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "invalid swap id" })),
            )
                .into_response();
        }
    };

    match state.resolver.get_status(&swap_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(ResolverError::SwapNotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "swap not found" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    running: bool,
    chains: Vec<crate::resolver::ChainHealth>,
}
