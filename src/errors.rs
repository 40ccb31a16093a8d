use crate::{serializers::FieldErrors, services::item_service::ItemError};
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// An API-layer failure, rendered as the uniform error envelope.
///
/// `details` is what the client sees. `cause` is the full error text, which
/// only reaches the server log.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub details: Value,
    pub cause: String,
}

/// Response extension marking a body produced by [`AppError`].
///
/// The error-logging middleware acts only on responses carrying it.
#[derive(Clone, Debug)]
pub struct ApiFailure {
    pub cause: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: bool,
    message: &'static str,
    details: Value,
    status_code: u16,
}

impl AppError {
    /// Create an AppError with structured details.
    pub fn new(status: StatusCode, details: Value, cause: impl Into<String>) -> Self {
        Self {
            status,
            details,
            cause: cause.into(),
        }
    }

    /// An error whose details are `{"detail": msg}`.
    pub fn detail(status: StatusCode, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::new(status, json!({ "detail": msg }), msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::detail(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for a 500 Internal Server Error. The cause stays server-side.
    pub fn internal(cause: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "A server error occurred." }),
            cause.to_string(),
        )
    }

    /// Headline of the envelope for a status code.
    pub fn category_message(status: StatusCode) -> &'static str {
        match status {
            StatusCode::BAD_REQUEST => "Invalid input data",
            StatusCode::NOT_FOUND => "Resource not found",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error",
            _ => "An error occurred",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cause, self.status)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope {
            error: true,
            message: Self::category_message(self.status),
            details: self.details,
            status_code: self.status.as_u16(),
        });

        let mut response = (self.status, body).into_response();
        response
            .extensions_mut()
            .insert(ApiFailure { cause: self.cause });
        response
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        let cause = errors.to_string();
        match serde_json::to_value(&errors) {
            Ok(details) => Self::new(StatusCode::BAD_REQUEST, details, cause),
            Err(err) => Self::internal(err),
        }
    }
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                json!({ "detail": "No Item matches the given query." }),
                err.to_string(),
            ),
            ItemError::InvalidPage(_) => Self::new(
                StatusCode::NOT_FOUND,
                json!({ "detail": "Invalid page." }),
                err.to_string(),
            ),
            ItemError::ConstraintViolation(ref msg) => Self::new(
                StatusCode::BAD_REQUEST,
                json!({ "detail": msg }),
                err.to_string(),
            ),
            ItemError::Sqlx(err) => Self::internal(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(err) => Self::detail(
                StatusCode::BAD_REQUEST,
                format!("JSON parse error - {}", err.body_text()),
            ),
            other => Self::detail(other.status(), other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::detail(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}
