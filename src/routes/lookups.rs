//! Manufacturers, categories and set names. The three tables share one shape, so one set
//! of handlers serves all of them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::{validation::validate_name, AppResult},
    session::Session,
    state::AppState,
    store::{Lookup, LookupStore},
    types::{NameRequest, NamedEntry},
};

async fn list_entries(state: AppState, lookup: Lookup) -> AppResult<Json<Vec<NamedEntry>>> {
    Ok(Json(state.store.list_entries(lookup).await?))
}

async fn create_entry(
    state: AppState,
    session: Session,
    lookup: Lookup,
    req: NameRequest,
) -> AppResult<(StatusCode, Json<NamedEntry>)> {
    session.require_admin()?;
    let name = validate_name(&req.name, "name")?;
    let entry = state.store.create_entry(lookup, &name).await?;
    tracing::info!("Created {} {} ({})", lookup.entity(), entry.id, entry.name);
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn rename_entry(
    state: AppState,
    session: Session,
    lookup: Lookup,
    id: Uuid,
    req: NameRequest,
) -> AppResult<Json<NamedEntry>> {
    session.require_admin()?;
    let name = validate_name(&req.name, "name")?;
    let entry = state.store.rename_entry(lookup, id, &name).await?;
    tracing::info!("Renamed {} {} to {}", lookup.entity(), id, entry.name);
    Ok(Json(entry))
}

/// `GET|POST {base}` and `PUT {base}/{id}` for one lookup table. Listing only needs a
/// session; changes need the admin role.
pub fn routes(base: &str, lookup: Lookup) -> Router<AppState> {
    Router::new()
        .route(
            base,
            get(move |State(state): State<AppState>, _session: Session| list_entries(state, lookup)).post(
                move |State(state): State<AppState>, session: Session, Json(req): Json<NameRequest>| {
                    create_entry(state, session, lookup, req)
                },
            ),
        )
        .route(
            &format!("{}/{{id}}", base),
            put(
                move |State(state): State<AppState>,
                      session: Session,
                      Path(id): Path<Uuid>,
                      Json(req): Json<NameRequest>| rename_entry(state, session, lookup, id, req),
            ),
        )
}
