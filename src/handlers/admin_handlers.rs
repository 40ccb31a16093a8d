//! Read-only management console over the item table.
//!
//! - GET /admin/items/ -> HTML table of items, newest first, with search
//!   and page links

use crate::{
    errors::AppError,
    handlers::item_handlers::{QueryPairs, parse_page},
    services::item_service::{ItemPage, ItemService, ListItemsParams},
};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Html,
};
use chrono::SecondsFormat;
use url::form_urlencoded;

pub const ADMIN_ITEMS_PATH: &str = "/admin/items/";

/// Console query: `q` searches, `page` selects the page. Last value wins.
#[derive(Debug, Default)]
pub struct AdminQuery {
    pub search: Option<String>,
    pub page: Option<String>,
}

impl AdminQuery {
    pub fn from_pairs(pairs: QueryPairs) -> Self {
        let mut q = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "q" => q.search = Some(value),
                "page" => q.page = Some(value),
                _ => {}
            }
        }
        q
    }
}

/// `GET /admin/items/`
pub async fn admin_items(
    State(service): State<ItemService>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Html<String>, AppError> {
    let Query(pairs) = query?;
    let q = AdminQuery::from_pairs(pairs);
    let params = ListItemsParams {
        search: q.search.clone(),
        page: parse_page(q.page.as_deref())?,
        ..ListItemsParams::default()
    };
    let page = service.list_items(&params).await?;

    Ok(Html(render_item_table(
        &page,
        q.search.as_deref().unwrap_or(""),
    )))
}

fn render_item_table(page: &ItemPage, search: &str) -> String {
    let count = page.count;
    let mut html = String::from(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Items Management</title></head><body>"#,
    );
    html.push_str("<h1>Items Management</h1>");
    html.push_str(&format!(
        r#"<form method="get"><input type="search" name="q" value="{}"><button type="submit">Search</button></form>"#,
        html_escape(search)
    ));
    html.push_str(&format!("<p>{} item{}</p>", count, if count == 1 { "" } else { "s" }));

    html.push_str("<table><thead><tr>");
    for heading in ["Name", "Price", "Created at", "Updated at"] {
        html.push_str(&format!("<th>{}</th>", heading));
    }
    html.push_str("</tr></thead><tbody>");

    for item in &page.items {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", html_escape(&item.name)));
        html.push_str(&format!("<td>${}</td>", item.price));
        html.push_str(&format!(
            "<td>{}</td>",
            item.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        html.push_str(&format!(
            "<td>{}</td>",
            item.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    if page.num_pages > 1 {
        html.push_str("<nav>");
        if page.has_previous() {
            html.push_str(&format!(
                r#"<a href="{}">previous</a> "#,
                html_escape(&console_link(search, page.page - 1))
            ));
        }
        html.push_str(&format!("Page {} of {}", page.page, page.num_pages));
        if page.has_next() {
            html.push_str(&format!(
                r#" <a href="{}">next</a>"#,
                html_escape(&console_link(search, page.page + 1))
            ));
        }
        html.push_str("</nav>");
    }

    html.push_str("</body></html>");
    html
}

/// Console URL for `page`, keeping the search term. Page 1 carries no `page`.
fn console_link(search: &str, page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !search.is_empty() {
        query.append_pair("q", search);
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();

    if query.is_empty() {
        ADMIN_ITEMS_PATH.to_string()
    } else {
        format!("{}?{}", ADMIN_ITEMS_PATH, query)
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
