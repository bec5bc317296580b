use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::config::ConfigCheck;

#[derive(Serialize)]
pub struct HealthCheckResponse {
    status: String,
}

pub async fn health_check() -> Json<HealthCheckResponse> {
    let response = HealthCheckResponse {
        status: "ok".to_string(),
    };
    Json(response)
}

/// GET /api/config/check — flags for required environment configuration.
pub async fn config_check(State(state): State<AppState>) -> Json<Value> {
    let config = ConfigCheck::from_config(&state.config);
    Json(json!({
        "success": true,
        "config": config,
        "message": "Environment configuration check completed",
    }))
}
