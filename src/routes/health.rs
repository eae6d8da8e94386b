//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz   - readiness (can the service reach MongoDB?)

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// 'online' when the database is reachable, 'degraded' otherwise
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Database connectivity
    pub database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
}

async fn build_health_response(state: &AppState) -> HealthResponse {
    let db_connected = state.mongo.ping().await.is_ok();

    HealthResponse {
        healthy: true,
        status: if db_connected { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        database: DatabaseHealth {
            connected: db_connected,
        },
    }
}

/// Liveness probe (/health, /healthz); 200 whenever the process is up
pub async fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state).await;
    json_response(StatusCode::OK, &response)
}

/// Readiness probe (/ready, /readyz); 503 until MongoDB answers a ping
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state).await;

    let status = if response.database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, &response)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub service: &'static str,
}

/// Version endpoint (/version) for deployment verification
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            service: "leadhub",
        },
    )
}
