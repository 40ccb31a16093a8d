//! Defines routes for the item API, admin console and health probes.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `GET    /items/` lists items (search, ordering, filters, page)
//!   - `POST   /items/` creates an item
//!
//! - **Instance endpoints**
//!   - `GET    /items/{id}/` retrieves an item
//!   - `PUT    /items/{id}/` updates an item
//!   - `PATCH  /items/{id}/` partially updates an item
//!   - `DELETE /items/{id}/` deletes an item
//!
//! Unmatched paths and methods answer with the same error envelope as the
//! handlers.

use crate::{
    errors::AppError,
    handlers::{
        admin_handlers::admin_items,
        health_handlers::{healthz, readyz},
        item_handlers::{
            create_item, delete_item, get_item, list_items, partial_update_item, replace_item,
        },
    },
    middleware::log_api_errors,
    services::item_service::ItemService,
};
use axum::{Router, http::Method, middleware, routing::get};
use tower_http::trace::TraceLayer;

/// Build and return the router for every endpoint.
///
/// The router carries shared state (`ItemService`) to all handlers.
pub fn routes() -> Router<ItemService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/admin/items/", get(admin_items))
        // Collection routes
        .route("/items/", get(list_items).post(create_item))
        // Instance routes
        .route(
            "/items/{id}/",
            get(get_item)
                .put(replace_item)
                .patch(partial_update_item)
                .delete(delete_item),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(log_api_errors))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> AppError {
    AppError::not_found("Not found.")
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::detail(
        axum::http::StatusCode::METHOD_NOT_ALLOWED,
        format!("Method \"{}\" not allowed.", method),
    )
}
