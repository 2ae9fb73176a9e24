//! Mission session handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::agent::run_triage;
use super::AppJson;
use crate::logic::session::store::SessionHandle;
use crate::logic::triage::TriageInput;
use crate::models::mission::parse_anomaly_log;
use crate::models::{MergeRequest, MissionSummaryResponse, SessionLogRequest, SessionResponse, SessionTriageRequest};
use crate::{AppError, AppResult, AppState};

fn find(state: &AppState, id: Uuid) -> AppResult<SessionHandle> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
}

/// Start a session for a new detection run
pub async fn create(
    State(state): State<AppState>,
    AppJson(req): AppJson<SessionLogRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let records = parse_anomaly_log(req.anomaly_log)?;
    let (id, handle) = state.sessions.create(records);
    let snapshot = handle.lock().await.snapshot();

    tracing::info!("Session {} created with {} records", id, snapshot.summary.total);

    Ok((StatusCode::CREATED, Json(SessionResponse::new(id, snapshot))))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<SessionResponse>> {
    let handle = find(&state, id)?;
    let snapshot = handle.lock().await.snapshot();
    Ok(Json(SessionResponse::new(id, snapshot)))
}

/// Replace every record (operator started a new run)
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SessionLogRequest>,
) -> AppResult<Json<SessionResponse>> {
    let records = parse_anomaly_log(req.anomaly_log)?;
    let handle = find(&state, id)?;

    let mut session = handle.lock().await;
    session.new_run(records);
    Ok(Json(SessionResponse::new(id, session.snapshot())))
}

/// Append a batch to the current run
pub async fn merge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<MergeRequest>,
) -> AppResult<Json<SessionResponse>> {
    let records = parse_anomaly_log(req.anomaly_log)?;
    let offered = records.len();
    let handle = find(&state, id)?;

    let mut session = handle.lock().await;
    let accepted = if req.dedupe {
        session.merge_deduplicated(records)
    } else {
        session.merge(records);
        offered
    };

    tracing::debug!("Session {}: merged {}/{} records", id, accepted, offered);

    Ok(Json(SessionResponse::new(id, session.snapshot()).with_accepted(accepted)))
}

/// Operator removed one detection
pub async fn remove_record(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<SessionResponse>> {
    let handle = find(&state, id)?;

    let mut session = handle.lock().await;
    let removed = session.remove_at(index)?;

    tracing::debug!("Session {}: removed '{}' at {}", id, removed.class_name, removed.timestamp);

    Ok(Json(SessionResponse::new(id, session.snapshot())))
}

pub async fn reset(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<SessionResponse>> {
    let handle = find(&state, id)?;

    let mut session = handle.lock().await;
    session.reset();
    Ok(Json(SessionResponse::new(id, session.snapshot())))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {} not found", id)))
    }
}

/// Triage the session's current records
pub async fn triage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SessionTriageRequest>,
) -> AppResult<Json<MissionSummaryResponse>> {
    req.mission.validate()?;
    let handle = find(&state, id)?;

    // Lock released before the provider calls
    let snapshot = handle.lock().await.snapshot();

    let (context, send_requested) = req.mission.into_context();
    let input = TriageInput {
        records: snapshot.records,
        counts: snapshot.counts,
        summary: snapshot.summary,
        context,
        send_requested,
    };

    let result = run_triage(&state, input).await?;
    Ok(Json(result.into()))
}
