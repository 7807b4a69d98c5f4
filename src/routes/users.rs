use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppResult,
    session::Session,
    state::AppState,
    types::{CreateUserRequest, UpdateUserRequest, User},
};

pub async fn list_users(State(state): State<AppState>, session: Session) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.engine().list_users(&session).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.engine().create_user(&session, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(state): State<AppState>, session: Session, Path(id): Path<Uuid>) -> AppResult<Json<User>> {
    Ok(Json(state.engine().get_user(&session, id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(state.engine().update_user(&session, id, req).await?))
}

pub async fn delete_user(State(state): State<AppState>, session: Session, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.engine().delete_user(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_set(
    State(state): State<AppState>,
    session: Session,
    Path((id, set_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().grant_set_to_user(&session, id, set_id).await?;
    Ok(Json(json!({ "set_id": set_id, "outcome": outcome })))
}

pub async fn revoke_set(
    State(state): State<AppState>,
    session: Session,
    Path((id, set_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let outcome = state.engine().revoke_set_from_user(&session, id, set_id).await?;
    Ok(Json(json!({ "set_id": set_id, "outcome": outcome })))
}
