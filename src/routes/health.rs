use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::fmt::Write as _;

// Liveness: no database access, no session required
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

// Prometheus text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let series: [(&str, &str, &str, u64); 9] = [
        ("groups_created", "Assignment groups created", "counter", m.groups_created as u64),
        ("groups_deleted", "Assignment groups deleted", "counter", m.groups_deleted as u64),
        ("references_removed", "References removed by cascading deletes", "counter", m.references_removed),
        ("bulk_items_succeeded", "Batch items applied", "counter", m.bulk_items_succeeded),
        ("bulk_items_failed", "Batch items failed", "counter", m.bulk_items_failed),
        ("sets_copied", "Sets duplicated with their products", "counter", m.sets_copied as u64),
        ("authorized_lookups", "Authorized set resolutions", "counter", m.authorized_lookups),
        ("write_conflicts", "Writes abandoned after repeated version conflicts", "counter", m.write_conflicts),
        ("uptime_seconds", "Uptime seconds", "gauge", m.uptime_seconds),
    ];

    let mut body = String::new();
    for (name, help, kind, value) in series {
        let _ = write!(
            body,
            "# HELP ausleihe_{name} {help}\n# TYPE ausleihe_{name} {kind}\nausleihe_{name} {value}\n"
        );
    }
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
