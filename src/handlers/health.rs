//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    classes: Vec<String>,
    critical_classes: Vec<String>,
    warning_classes: Vec<String>,
    llm_enabled: bool,
    messaging_enabled: bool,
}

/// Liveness plus the active configuration. Never calls a provider.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let partition = state.engine.partition();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        classes: partition.known_classes(),
        critical_classes: partition.critical.clone(),
        warning_classes: partition.warning.clone(),
        llm_enabled: state.engine.enhancer_name() != "passthrough",
        messaging_enabled: state.engine.messaging_enabled(),
    })
}
