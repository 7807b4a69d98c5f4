//! HTTP route handlers.
//!
//! - `health`: liveness, readiness, metrics and version
//! - `set_assignments`: assignment groups, their members, bulk add and copy
//! - `sets`: the set catalog, authorized sets, form updates and set copy
//! - `users`: users, their assignments and direct grants
//! - `lookups`: manufacturers, categories and set names

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware;
use crate::state::AppState;
use crate::store::Lookup;

pub mod health;
pub mod lookups;
pub mod set_assignments;
pub mod sets;
pub mod users;

/// The complete application: routes, state and the middleware stack.
pub fn router(state: AppState) -> Router {
    let cfg_arc = state.config.clone();
    let max_body = state.config.server.max_body_bytes;

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route(
            "/api/set-assignments",
            get(set_assignments::list_groups).post(set_assignments::create_group),
        )
        .route(
            "/api/set-assignments/{id}",
            put(set_assignments::rename_group).delete(set_assignments::delete_group),
        )
        .route("/api/set-assignments/{id}/members", get(set_assignments::members))
        .route("/api/set-assignments/{id}/sets", post(set_assignments::bulk_add_sets))
        .route(
            "/api/set-assignments/{id}/sets/{set_id}",
            post(set_assignments::add_set).delete(set_assignments::remove_set),
        )
        .route(
            "/api/set-assignments/{id}/users/{user_id}",
            post(set_assignments::add_user).delete(set_assignments::remove_user),
        )
        .route("/api/set-assignments/{id}/copy", post(set_assignments::copy_assignments))
        .route("/api/sets", get(sets::list_sets).post(sets::create_set))
        .route("/api/sets/authorized", get(sets::authorized_sets))
        .route("/api/sets/{id}", get(sets::get_set).put(sets::update_set).delete(sets::delete_set))
        .route("/api/sets/{id}/copy", get(sets::copy_draft).post(sets::copy_commit))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/{id}", get(users::get_user).put(users::update_user).delete(users::delete_user))
        .route("/api/users/{id}/sets/{set_id}", post(users::grant_set).delete(users::revoke_set))
        .merge(lookups::routes("/api/manufacturers", Lookup::Manufacturers))
        .merge(lookups::routes("/api/categories", Lookup::Categories))
        .merge(lookups::routes("/api/set-names", Lookup::SetNames))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(from_fn_with_state(cfg_arc.clone(), middleware::validation::validate_request_middleware))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg_arc, middleware::security_headers::security_headers_middleware))
}
