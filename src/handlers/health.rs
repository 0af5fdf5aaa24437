//! Health check handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db_pool {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => "connected".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed");
                "unreachable".to_string()
            }
        },
        None => "in-memory".to_string(),
    };

    let status = if database == "unreachable" {
        "unhealthy"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
