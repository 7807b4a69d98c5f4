use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::ip::{client_ip, MaybeRemoteAddr},
    session::Session,
    state::{AppState, BULK_ENDPOINT, COPY_ENDPOINT},
    types::{AssignmentGroup, BatchReport, BulkAddRequest, CopyGroupRequest, GroupMembers, NameRequest},
};

pub async fn list_groups(State(state): State<AppState>, session: Session) -> AppResult<Json<Vec<AssignmentGroup>>> {
    Ok(Json(state.engine().list_groups(&session).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<NameRequest>,
) -> AppResult<(StatusCode, Json<AssignmentGroup>)> {
    let group = state.engine().create_group(&session, &req.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn rename_group(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<NameRequest>,
) -> AppResult<Json<AssignmentGroup>> {
    Ok(Json(state.engine().rename_group(&session, id, &req.name).await?))
}

/// Cascading delete. Answers 409 with the report when some record could not be cleaned
/// up and the group was therefore kept.
pub async fn delete_group(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let report = state.engine().delete_assignment_group(&session, id).await?;
    let status = if report.failed.is_empty() { StatusCode::OK } else { StatusCode::CONFLICT };
    Ok((status, Json(report)).into_response())
}

pub async fn members(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GroupMembers>> {
    Ok(Json(state.engine().members_of_group(&session, id).await?))
}

pub async fn bulk_add_sets(
    State(state): State<AppState>,
    session: Session,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<BulkAddRequest>,
) -> AppResult<Json<BatchReport>> {
    state.rate_limiter.check_endpoint_limit(BULK_ENDPOINT, client_ip(&headers, remote)).await?;
    Ok(Json(state.engine().bulk_add_sets(&session, id, &req.set_ids).await?))
}

pub async fn add_set(
    State(state): State<AppState>,
    session: Session,
    Path((id, set_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().add_set_to_group(&session, set_id, id).await?;
    Ok(Json(json!({ "set_id": set_id, "outcome": outcome })))
}

pub async fn remove_set(
    State(state): State<AppState>,
    session: Session,
    Path((id, set_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().remove_set_from_group(&session, set_id, id).await?;
    Ok(Json(json!({ "set_id": set_id, "outcome": outcome })))
}

pub async fn add_user(
    State(state): State<AppState>,
    session: Session,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().add_user_to_group(&session, user_id, id).await?;
    Ok(Json(json!({ "user_id": user_id, "outcome": outcome })))
}

pub async fn remove_user(
    State(state): State<AppState>,
    session: Session,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().remove_user_from_group(&session, user_id, id).await?;
    Ok(Json(json!({ "user_id": user_id, "outcome": outcome })))
}

pub async fn copy_assignments(
    State(state): State<AppState>,
    session: Session,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<CopyGroupRequest>,
) -> AppResult<Json<BatchReport>> {
    state.rate_limiter.check_endpoint_limit(COPY_ENDPOINT, client_ip(&headers, remote)).await?;
    let report = state
        .engine()
        .copy_group_assignments(&session, id, req.target_group_id, req.set_ids.as_deref())
        .await?;
    Ok(Json(report))
}
