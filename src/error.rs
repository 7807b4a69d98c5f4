use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::fmt;
use uuid::Uuid;

use crate::store::StoreError;

/// A single failed field check, optionally tied to an item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Position of the offending item in the submitted batch, if the check was per item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(item: Option<usize>, field: &str, message: impl Into<String>) -> Self {
        Self { item, field: field.to_string(), message: message.into() }
    }
}

/// An identity value that occurs more than once within one submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateIdentity {
    pub field: String,
    pub value: String,
    /// Positions of every item carrying the value.
    pub items: Vec<usize>,
}

/// The primary error type for the application.
///
/// This enum consolidates all possible errors that can occur within the application,
/// providing a unified way to handle and respond to failures.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For when a request conflicts with the current state of the server.
    Conflict(String),
    /// For when a service is temporarily unavailable.
    ServiceUnavailable(String),
    /// For errors related to database operations.
    Database(String),
    /// For when a request is not authenticated.
    Unauthorized(String),
    /// For when the caller is authenticated but lacks the required role.
    Forbidden(String),
    /// For when a client has sent too many requests in a given amount of time.
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
    /// For when a specific field in a request fails validation.
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
    /// For batch submissions where one or more items fail validation. Nothing was applied.
    ValidationErrors(Vec<FieldIssue>),
    /// For batch submissions carrying the same identity value more than once. Nothing was applied.
    DuplicateIdentities(Vec<DuplicateIdentity>),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
            AppError::ValidationErrors(issues) => write!(f, "Validation failed with {} issue(s)", issues.len()),
            AppError::DuplicateIdentities(dups) => {
                write!(f, "Duplicate identity values in batch: {}", dups.len())
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                let error_id = Uuid::new_v4();
                tracing::error!("Error ID: {}", error_id);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    Some(json!({ "details": msg })),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
            AppError::ValidationErrors(issues) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed with {} issue(s); nothing was submitted", issues.len()),
                Some(json!({ "issues": issues })),
            ),
            AppError::DuplicateIdentities(duplicates) => (
                StatusCode::CONFLICT,
                "DUPLICATE_IDENTITY",
                "Identity values must be unique within the batch; nothing was submitted".to_string(),
                Some(json!({ "duplicates": duplicates })),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(format!("Database error: {}", err)),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => AppError::NotFound(format!("{} not found: {}", entity, id)),
            StoreError::DuplicateName { entity, name } => {
                AppError::Conflict(format!("{} with name '{}' already exists", entity, name))
            }
            StoreError::MissingReference(msg) => AppError::BadRequest(msg),
            StoreError::Database(e) => e.into(),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// A module containing helper functions for request validation.
pub mod validation {
    use super::*;

    pub const MAX_NAME_LEN: usize = 200;

    /// Validates a display name (group, manufacturer, category, set name) and returns it trimmed.
    ///
    /// # Arguments
    ///
    /// * `name` - The submitted name.
    /// * `field` - The name of the field being validated.
    pub fn validate_name(name: &str, field: &str) -> AppResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: "Name cannot be empty".to_string(),
            });
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: format!("Name must not exceed {} characters", MAX_NAME_LEN),
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: "Name contains control characters".to_string(),
            });
        }
        Ok(trimmed.to_string())
    }

    /// Rejects batches larger than the configured limit before any item is touched.
    pub fn validate_batch_size(len: usize, max: usize, field: &str) -> AppResult<()> {
        if len > max {
            return Err(AppError::ValidationError {
                field: field.to_string(),
                message: format!("At most {} items per request, got {}", max, len),
            });
        }
        Ok(())
    }
}
