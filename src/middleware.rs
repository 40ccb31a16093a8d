//! Request middleware.

use crate::errors::ApiFailure;
use axum::{extract::Request, middleware::Next, response::Response};

/// Log every normalized API error with the request that triggered it.
///
/// Only responses built from [`crate::errors::AppError`] are logged; other
/// responses pass through untouched.
pub async fn log_api_errors(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    if let Some(failure) = response.extensions().get::<ApiFailure>() {
        tracing::error!(
            "API Error: {} - {} {} -> {}",
            failure.cause,
            method,
            uri,
            response.status()
        );
    }

    response
}
