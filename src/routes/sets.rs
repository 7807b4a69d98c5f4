use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    assignment::{decode_form_assignment, RawRef},
    error::{AppError, AppResult},
    middleware::ip::{client_ip, MaybeRemoteAddr},
    session::Session,
    state::{AppState, AUTHORIZED_ENDPOINT, SET_COPY_ENDPOINT},
    types::{CreateSetRequest, Set, SetCopyDraft, SetCopyResult, SetPatch},
};

pub async fn list_sets(State(state): State<AppState>, session: Session) -> AppResult<Json<Vec<Set>>> {
    Ok(Json(state.engine().list_sets(&session).await?))
}

pub async fn authorized_sets(
    State(state): State<AppState>,
    session: Session,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Set>>> {
    state.rate_limiter.check_endpoint_limit(AUTHORIZED_ENDPOINT, client_ip(&headers, remote)).await?;
    Ok(Json(state.engine().authorized_sets_for(&session).await?))
}

pub async fn create_set(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateSetRequest>,
) -> AppResult<(StatusCode, Json<Set>)> {
    let set = state.engine().create_set(&session, req).await?;
    Ok((StatusCode::CREATED, Json(set)))
}

pub async fn get_set(State(state): State<AppState>, session: Session, Path(id): Path<Uuid>) -> AppResult<Json<Set>> {
    Ok(Json(state.engine().get_set(&session, id).await?))
}

/// Form update. Fields that are absent stay unchanged; `set_assignment`, when present,
/// replaces the availability.
pub async fn update_set(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Set>> {
    let form = read_set_form(multipart).await?;
    Ok(Json(state.engine().update_set(&session, id, form.patch, form.assignment).await?))
}

pub async fn delete_set(State(state): State<AppState>, session: Session, Path(id): Path<Uuid>) -> AppResult<Response> {
    let report = state.engine().delete_set(&session, id).await?;
    let status = if report.failed.is_empty() { StatusCode::OK } else { StatusCode::CONFLICT };
    Ok((status, Json(report)).into_response())
}

pub async fn copy_draft(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SetCopyDraft>> {
    Ok(Json(state.engine().prepare_set_copy(&session, id).await?))
}

pub async fn copy_commit(
    State(state): State<AppState>,
    session: Session,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(draft): Json<SetCopyDraft>,
) -> AppResult<(StatusCode, Json<SetCopyResult>)> {
    state.rate_limiter.check_endpoint_limit(SET_COPY_ENDPOINT, client_ip(&headers, remote)).await?;
    let result = state.engine().commit_set_copy(&session, id, draft).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Default)]
pub struct SetForm {
    pub patch: SetPatch,
    /// `Some(None)` when the form asked for free availability.
    pub assignment: Option<Option<Vec<RawRef>>>,
}

fn form_uuid(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| AppError::ValidationError {
        field: field.to_string(),
        message: format!("Invalid UUID: {}", value),
    })
}

/// Reads the text fields of a set form. Unknown fields (e.g. image uploads) are skipped.
pub async fn read_set_form(mut multipart: Multipart) -> AppResult<SetForm> {
    let mut form = SetForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !matches!(
            name.as_str(),
            "manufacturer_id" | "set_name_id" | "category_id" | "set_number" | "state_id" | "set_assignment"
        ) {
            tracing::debug!("Ignoring form field {:?}", name);
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Unreadable form field {}: {}", name, e)))?;

        match name.as_str() {
            "manufacturer_id" => form.patch.manufacturer_id = Some(form_uuid(&name, &value)?),
            "set_name_id" => form.patch.set_name_id = Some(form_uuid(&name, &value)?),
            "category_id" => form.patch.category_id = Some(form_uuid(&name, &value)?),
            "set_number" => form.patch.set_number = Some(value.trim().to_string()),
            "state_id" => form.patch.state_id = Some(value.trim().to_string()),
            _ => {
                let decoded = decode_form_assignment(&value).map_err(|e| AppError::ValidationError {
                    field: "set_assignment".to_string(),
                    message: format!("Expected a JSON array of ids or \"null\": {}", e),
                })?;
                form.assignment = Some(decoded);
            }
        }
    }
    Ok(form)
}
