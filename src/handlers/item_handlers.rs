//! HTTP handlers for the item collection and item instances.
//!
//! Each handler picks its validation variant explicitly: `CreateItem` for
//! POST, `UpdateItem` for PUT and PATCH, and the `Item` serializer for every
//! response body.

use crate::{
    errors::AppError,
    models::item::Item,
    serializers::{self, CreateItem, ItemPayload, UpdateItem},
    services::item_service::{ItemFilters, ItemPage, ItemService, ListItemsParams, SortKey},
};
use axum::{
    Json,
    extract::{
        Path, Query, RawQuery, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;

/// Collection path; instance paths are `{ITEMS_PATH}{id}/`.
pub const ITEMS_PATH: &str = "/items/";

/// Decoded query pairs in request order, repeats included.
pub type QueryPairs = Vec<(String, String)>;

/// Query params accepted by the list endpoint.
#[derive(Debug, Default)]
pub struct ListItemsQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub page: Option<String>,
}

impl ListItemsQuery {
    /// A repeated parameter keeps its last value; unknown ones are ignored.
    pub fn from_pairs(pairs: QueryPairs) -> Self {
        let mut q = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "search" => &mut q.search,
                "ordering" => &mut q.ordering,
                "name" => &mut q.name,
                "description" => &mut q.description,
                "price" => &mut q.price,
                "page" => &mut q.page,
                _ => continue,
            };
            *slot = Some(value);
        }
        q
    }
}

/// Paginated listing body.
#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Item>,
}

/// `GET /items/`: search, filter, order and paginate.
pub async fn list_items(
    State(service): State<ItemService>,
    RawQuery(raw_query): RawQuery,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<ItemListResponse>, AppError> {
    let Query(pairs) = query?;
    let params = list_params(ListItemsQuery::from_pairs(pairs))?;
    let page = service.list_items(&params).await?;
    Ok(Json(page_response(page, raw_query.as_deref())))
}

/// `POST /items/`: validate with the create variant and persist.
pub async fn create_item(
    State(service): State<ItemService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let new_item: CreateItem = parse_payload(body)?;
    let item = service.create_item(new_item).await?;

    let location = format!("{}{}/", ITEMS_PATH, item.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(item),
    ))
}

/// `GET /items/{id}/`
pub async fn get_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError> {
    let item = service.get_item(parse_id(&id)?).await?;
    Ok(Json(item))
}

/// `PUT /items/{id}/`: same all-optional variant as PATCH.
pub async fn replace_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Item>, AppError> {
    apply_update(&service, &id, body).await
}

/// `PATCH /items/{id}/`
pub async fn partial_update_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Item>, AppError> {
    apply_update(&service, &id, body).await
}

/// `DELETE /items/{id}/`: hard delete, empty 204.
pub async fn delete_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete_item(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    service: &ItemService,
    id: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Item>, AppError> {
    let id = parse_id(id)?;
    // Unknown ids are reported before payload problems.
    service.get_item(id).await?;

    let changes: UpdateItem = parse_payload(body)?;
    let item = service.update_item(id, changes).await?;
    Ok(Json(item))
}

/// Decode a JSON body through the validation variant `P`.
fn parse_payload<P: ItemPayload>(body: Result<Json<Value>, JsonRejection>) -> Result<P, AppError> {
    let Json(value) = body?;
    let payload = serializers::payload_from_json(value)?;
    Ok(P::from_payload(&payload)?)
}

/// Ids that are not integers cannot name an item.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::not_found("No Item matches the given query."))
}

/// 1-based page number; absent means the first page.
pub fn parse_page(raw: Option<&str>) -> Result<u32, AppError> {
    match raw {
        None => Ok(1),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| AppError::not_found("Invalid page.")),
    }
}

fn list_params(q: ListItemsQuery) -> Result<ListItemsParams, AppError> {
    let page = parse_page(q.page.as_deref())?;

    let price = match q.price.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        None => None,
        Some(raw) => Some(serializers::parse_decimal(raw).ok_or_else(|| {
            AppError::from(serializers::FieldErrors::single("price", "Enter a number."))
        })?),
    };

    Ok(ListItemsParams {
        search: q.search,
        ordering: SortKey::parse_list(q.ordering.as_deref()),
        filters: ItemFilters {
            name: q.name,
            description: q.description,
            price,
        },
        page,
    })
}

fn page_response(page: ItemPage, raw_query: Option<&str>) -> ItemListResponse {
    let next = page
        .has_next()
        .then(|| page_link(raw_query, page.page + 1));
    let previous = page
        .has_previous()
        .then(|| page_link(raw_query, page.page - 1));

    ItemListResponse {
        count: page.count,
        next,
        previous,
        results: page.items,
    }
}

/// Link to another page of the same listing, keeping every other query pair
/// as the client sent it. Page 1 is addressed without a `page` pair.
fn page_link(raw_query: Option<&str>, page: u32) -> String {
    let page_pair = format!("page={}", page);
    let mut pairs: Vec<&str> = raw_query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .collect();
    if page > 1 {
        pairs.push(&page_pair);
    }

    if pairs.is_empty() {
        ITEMS_PATH.to_string()
    } else {
        format!("{}?{}", ITEMS_PATH, pairs.join("&"))
    }
}
