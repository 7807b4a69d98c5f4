use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;
use crate::store::UserDirectory;

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the caller from the bearer token against the session table.
///
/// Requests without a header, with a malformed header, or with a token that matches no
/// session are rejected with 401 before the handler runs.
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        match state.store.user_for_token(token).await? {
            Some(user) => Ok(Session::for_user(&user)),
            None => {
                tracing::debug!("Rejected unknown session token");
                Err(AppError::Unauthorized("Invalid or expired session".to_string()))
            }
        }
    }
}
