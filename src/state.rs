use std::sync::Arc;

use crate::config::AppConfig;
use crate::consistency::ConsistencyEngine;
use crate::metrics::Metrics;
use crate::middleware::EndpointRateLimiter;
use crate::store::SqliteStore;

/// Endpoint keys for the per-endpoint rate limits.
pub const BULK_ENDPOINT: &str = "/api/set-assignments/{id}/sets";
pub const COPY_ENDPOINT: &str = "/api/set-assignments/{id}/copy";
pub const SET_COPY_ENDPOINT: &str = "/api/sets/{id}/copy";
pub const AUTHORIZED_ENDPOINT: &str = "/api/sets/authorized";

/// The shared application state.
///
/// Cloned into every handler by Axum; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool, used directly by the readiness probe.
    pub db: sqlx::SqlitePool,
    /// The store contracts over the same pool.
    pub store: SqliteStore,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Limits for the bulk, copy and authorized-set endpoints.
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let rl = &config.rate_limit;
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            (BULK_ENDPOINT, rl.bulk_max_requests, rl.window_seconds),
            (COPY_ENDPOINT, rl.copy_max_requests, rl.window_seconds),
            (SET_COPY_ENDPOINT, rl.copy_max_requests, rl.window_seconds),
            (AUTHORIZED_ENDPOINT, rl.authorized_max_requests, rl.window_seconds),
        ]);

        Self {
            store: SqliteStore::new(db.clone()),
            db,
            config: Arc::new(config),
            metrics: Metrics::new(),
            rate_limiter,
        }
    }

    /// An engine over this state's store, limits and metrics.
    pub fn engine(&self) -> ConsistencyEngine<SqliteStore> {
        ConsistencyEngine::new(self.store.clone(), self.config.engine, self.metrics.clone())
    }
}
