//! Agent handlers

use axum::{extract::State, Json};

use super::AppJson;
use crate::logic::triage::{AgentResult, TriageInput};
use crate::models::{MissionSummaryRequest, MissionSummaryResponse};
use crate::{AppError, AppResult, AppState};

/// Triage a full mission payload
pub async fn mission_summary(
    State(state): State<AppState>,
    AppJson(req): AppJson<MissionSummaryRequest>,
) -> AppResult<Json<MissionSummaryResponse>> {
    let input = req.into_input(state.engine.partition())?;

    tracing::debug!(
        "Mission summary requested: '{}' ({} records)",
        input.context.mission_name,
        input.records.len()
    );

    let result = run_triage(&state, input).await?;
    Ok(Json(result.into()))
}

/// Run the engine on its own task under a child of the shutdown token.
///
/// If the client goes away this future is dropped, the guard cancels the
/// token, and a triage that has not dispatched yet sends nothing.
pub(crate) async fn run_triage(state: &AppState, input: TriageInput) -> AppResult<AgentResult> {
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let engine = state.engine.clone();

    tokio::spawn(async move { engine.triage(&input, &cancel).await })
        .await
        .map_err(|e| AppError::InternalError(format!("triage task failed: {}", e)))
}
