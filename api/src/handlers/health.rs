use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    models::{ComponentHealth, HealthResponse},
    AppState,
};

/// Liveness of the admin store, the audit chain and the loaded catalog
///
/// GET /api/admin/health
#[utoipa::path(
    get,
    path = "/api/admin/health",
    responses(
        (status = 200, description = "Store reachable and audit chain intact", body = HealthResponse),
        (status = 503, description = "A component failed", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query("SELECT 1")
        .fetch_one(state.manager.database().pool())
        .await
    {
        Ok(_) => ComponentHealth::ok("Admin store reachable"),
        Err(e) => ComponentHealth::failed(format!("Admin store unreachable: {}", e)),
    };

    let audit_log = match state.manager.audit_log().verify_log_chain().await {
        Ok(true) => ComponentHealth::ok("Audit chain intact"),
        Ok(false) => ComponentHealth::failed("Audit chain is broken"),
        Err(e) => ComponentHealth::failed(format!("Audit log unreadable: {}", e)),
    };

    let healthy = database.ok && audit_log.ok;
    let status = if healthy {
        info!("Health check: healthy");
        StatusCode::OK
    } else {
        warn!(
            "Health check: degraded (database: {}, audit log: {})",
            database.message, audit_log.message
        );
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        catalog_version: state.manager.catalog().version().to_string(),
        database,
        audit_log,
    };

    (status, Json(response))
}
