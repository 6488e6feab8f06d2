use axum::{extract::State, Json};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub database: Option<bool>,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let database = database_reachable(&state).await;

    let (code, status) = match database {
        Some(false) => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
        _ => (StatusCode::OK, "healthy"),
    };

    let response = HealthResponse {
        status: status.to_string(),
        version,
        environment: state.environment.clone(),
        database,
    };

    (code, Json(response))
}

#[cfg(feature = "database")]
async fn database_reachable(state: &AppState) -> Option<bool> {
    match &state.pool {
        Some(pool) => Some(crate::database::health_check(pool).await.is_ok()),
        None => None,
    }
}

#[cfg(not(feature = "database"))]
async fn database_reachable(_state: &AppState) -> Option<bool> {
    None
}
