//! ItemService: persistence operations for catalog items, backed by SQLite.
//!
//! Prices are stored as integer hundredths and timestamps as fixed-width
//! RFC 3339 text, so both order correctly inside SQL.

use crate::{
    models::item::{
        ITEM_COLUMNS, Item, PRICE_SCALE, format_timestamp, now_micros, price_to_cents,
    },
    serializers::{CreateItem, UpdateItem},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Page size used when configuration does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("item `{0}` not found")]
    NotFound(i64),
    #[error("page {0} is out of range")]
    InvalidPage(u32),
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ItemResult<T> = Result<T, ItemError>;

/// Columns a listing may be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderField {
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price_cents",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// One `ORDER BY` term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: OrderField,
    pub descending: bool,
}

impl SortKey {
    /// Newest first.
    pub const DEFAULT: SortKey = SortKey {
        field: OrderField::CreatedAt,
        descending: true,
    };

    /// Parse an `ordering` parameter such as `"price"` or `"-name,price"`.
    ///
    /// Unknown fields are dropped. When nothing usable remains, the default
    /// ordering applies.
    pub fn parse_list(raw: Option<&str>) -> Vec<SortKey> {
        let keys: Vec<SortKey> = raw
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, term),
                };
                OrderField::parse(name).map(|field| SortKey { field, descending })
            })
            .collect();

        if keys.is_empty() {
            vec![Self::DEFAULT]
        } else {
            keys
        }
    }
}

/// Exact-match filters for listings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemFilters {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

/// Parameters of a listing query.
#[derive(Clone, Debug)]
pub struct ListItemsParams {
    /// Case-insensitive substring matched against name or description.
    pub search: Option<String>,
    pub ordering: Vec<SortKey>,
    pub filters: ItemFilters,
    /// 1-based page number.
    pub page: u32,
}

impl Default for ListItemsParams {
    fn default() -> Self {
        Self {
            search: None,
            ordering: vec![SortKey::DEFAULT],
            filters: ItemFilters::default(),
            page: 1,
        }
    }
}

/// One page of a listing.
#[derive(Debug)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Total matches across all pages.
    pub count: u64,
    pub page: u32,
    pub num_pages: u32,
}

impl ItemPage {
    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// ItemService provides the item lifecycle:
/// - list with search, filters, ordering and pagination
/// - create, fetch, update and hard-delete single items
#[derive(Clone)]
pub struct ItemService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Number of items per listing page.
    pub page_size: u32,
}

impl ItemService {
    pub fn new(db: Arc<SqlitePool>, page_size: u32) -> Self {
        Self {
            db,
            page_size: page_size.max(1),
        }
    }

    /// List items matching `params`, one page at a time.
    ///
    /// Returns InvalidPage when `params.page` lies past the last page. The
    /// first page always exists, even when nothing matches.
    pub async fn list_items(&self, params: &ListItemsParams) -> ItemResult<ItemPage> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items");
        push_conditions(&mut count_query, params);
        let count: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&*self.db)
            .await?;
        let count = count.max(0) as u64;

        let page_size = u64::from(self.page_size);
        let num_pages = count.div_ceil(page_size).max(1) as u32;
        if params.page == 0 || params.page > num_pages {
            return Err(ItemError::InvalidPage(params.page));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM items", ITEM_COLUMNS));
        push_conditions(&mut builder, params);

        builder.push(" ORDER BY ");
        for key in &params.ordering {
            builder.push(key.field.column());
            builder.push(if key.descending { " DESC, " } else { " ASC, " });
        }
        builder.push("id DESC LIMIT ");
        builder.push_bind(page_size as i64);
        builder.push(" OFFSET ");
        builder.push_bind(((u64::from(params.page) - 1) * page_size) as i64);

        let items = builder
            .build_query_as::<Item>()
            .fetch_all(&*self.db)
            .await?;

        Ok(ItemPage {
            items,
            count,
            page: params.page,
            num_pages,
        })
    }

    /// Insert a new item. Both timestamps receive the same instant.
    pub async fn create_item(&self, new_item: CreateItem) -> ItemResult<Item> {
        let price_cents = checked_cents(new_item.price)?;
        let now = format_timestamp(&now_micros());

        let item = sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items (name, description, price_cents, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(&new_item.name)
        .bind(&new_item.description)
        .bind(price_cents)
        .bind(&now)
        .bind(&now)
        .fetch_one(&*self.db)
        .await
        .map_err(classify_write_error)?;

        debug!("created item {}", item.id);
        Ok(item)
    }

    /// Fetch one item by id.
    pub async fn get_item(&self, id: i64) -> ItemResult<Item> {
        sqlx::query_as::<_, Item>(&format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(ItemError::NotFound(id))
    }

    /// Apply `changes` to an existing item.
    ///
    /// Fields absent from `changes` keep their stored value. `updated_at`
    /// always moves forward, even when nothing else changes.
    pub async fn update_item(&self, id: i64, changes: UpdateItem) -> ItemResult<Item> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ItemError::NotFound(id))?;

        let name = changes.name.unwrap_or(current.name);
        let description = changes.description.unwrap_or(current.description);
        let price_cents = checked_cents(changes.price.unwrap_or(current.price))?;
        let updated_at = next_updated_at(&current.updated_at);

        let item = sqlx::query_as::<_, Item>(&format!(
            "UPDATE items SET name = ?, description = ?, price_cents = ?, updated_at = ?
             WHERE id = ?
             RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(&name)
        .bind(&description)
        .bind(price_cents)
        .bind(format_timestamp(&updated_at))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify_write_error)?;

        tx.commit().await?;
        debug!("updated item {}", id);
        Ok(item)
    }

    /// Hard-delete an item.
    pub async fn delete_item(&self, id: i64) -> ItemResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ItemError::NotFound(id));
        }

        debug!("deleted item {}", id);
        Ok(())
    }
}

/// Append the WHERE clause shared by the count and page queries.
fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, params: &ListItemsParams) {
    builder.push(" WHERE 1 = 1");

    if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        builder.push(r" AND (name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(r" ESCAPE '\' OR description LIKE ");
        builder.push_bind(pattern);
        builder.push(r" ESCAPE '\')");
    }

    let filters = &params.filters;
    if let Some(name) = &filters.name {
        builder.push(" AND name = ");
        builder.push_bind(name.clone());
    }
    if let Some(description) = &filters.description {
        builder.push(" AND description = ");
        builder.push_bind(description.clone());
    }
    if let Some(price) = filters.price {
        // A price with more than two digits can never match a stored one.
        let cents = if price.normalize().scale() <= PRICE_SCALE {
            price_to_cents(price)
        } else {
            None
        };
        match cents {
            Some(cents) => {
                builder.push(" AND price_cents = ");
                builder.push_bind(cents);
            }
            None => {
                builder.push(" AND 0");
            }
        }
    }
}

/// Escape `LIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn checked_cents(price: Decimal) -> ItemResult<i64> {
    price_to_cents(price)
        .ok_or_else(|| ItemError::ConstraintViolation(format!("price {} is out of range", price)))
}

/// A fresh `updated_at` that is strictly later than `previous`.
fn next_updated_at(previous: &DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > *previous {
        now
    } else {
        *previous + Duration::microseconds(1)
    }
}

/// Map CHECK / NOT NULL failures to ConstraintViolation.
fn classify_write_error(err: sqlx::Error) -> ItemError {
    match err {
        sqlx::Error::Database(db_err)
            if db_err
                .message()
                .to_ascii_lowercase()
                .contains("constraint failed") =>
        {
            ItemError::ConstraintViolation(db_err.message().to_string())
        }
        other => ItemError::Sqlx(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use std::str::FromStr;

    async fn service(page_size: u32) -> ItemService {
        ItemService::new(Arc::new(test_pool().await), page_size)
    }

    fn new_item(name: &str, description: Option<&str>, price: &str) -> CreateItem {
        CreateItem {
            name: name.to_string(),
            description: description.map(str::to_string),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    fn names(page: &ItemPage) -> Vec<&str> {
        page.items.iter().map(|item| item.name.as_str()).collect()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let svc = service(10).await;

        let created = svc
            .create_item(new_item("Desk Lamp", Some("LED desk lamp"), "19.99"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.price.to_string(), "19.99");

        let fetched = svc.get_item(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn storage_rejects_blank_names() {
        let svc = service(10).await;

        let err = svc.create_item(new_item("   ", None, "5")).await.unwrap_err();
        assert!(matches!(err, ItemError::ConstraintViolation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let svc = service(10).await;
        let created = svc
            .create_item(new_item("Desk Lamp", Some("LED desk lamp"), "19.99"))
            .await
            .unwrap();

        let updated = svc
            .update_item(
                created.id,
                UpdateItem {
                    price: Some(Decimal::from_str("24.99").unwrap()),
                    ..UpdateItem::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Desk Lamp");
        assert_eq!(updated.description.as_deref(), Some("LED desk lamp"));
        assert_eq!(updated.price.to_string(), "24.99");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn updated_at_increases_on_every_write() {
        let svc = service(10).await;
        let created = svc.create_item(new_item("Jeans", None, "40")).await.unwrap();

        let first = svc.update_item(created.id, UpdateItem::default()).await.unwrap();
        let second = svc.update_item(created.id, UpdateItem::default()).await.unwrap();

        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn update_can_clear_description() {
        let svc = service(10).await;
        let created = svc
            .create_item(new_item("Jeans", Some("Blue denim jeans"), "40"))
            .await
            .unwrap();

        let updated = svc
            .update_item(
                created.id,
                UpdateItem {
                    description: Some(None),
                    ..UpdateItem::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn missing_items_are_not_found() {
        let svc = service(10).await;

        assert!(matches!(svc.get_item(7).await, Err(ItemError::NotFound(7))));
        assert!(matches!(
            svc.update_item(7, UpdateItem::default()).await,
            Err(ItemError::NotFound(7))
        ));
        assert!(matches!(svc.delete_item(7).await, Err(ItemError::NotFound(7))));
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let svc = service(10).await;
        let created = svc.create_item(new_item("Jeans", None, "40")).await.unwrap();

        svc.delete_item(created.id).await.unwrap();
        assert!(matches!(
            svc.get_item(created.id).await,
            Err(ItemError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn default_listing_is_newest_first() {
        let svc = service(10).await;
        for name in ["first", "second", "third"] {
            svc.create_item(new_item(name, None, "1")).await.unwrap();
        }

        let page = svc.list_items(&ListItemsParams::default()).await.unwrap();
        assert_eq!(names(&page), ["third", "second", "first"]);
        assert_eq!(page.count, 3);
    }

    #[tokio::test]
    async fn ordering_by_price_and_name() {
        let svc = service(10).await;
        svc.create_item(new_item("b", None, "100")).await.unwrap();
        svc.create_item(new_item("c", None, "9.50")).await.unwrap();
        svc.create_item(new_item("a", None, "20")).await.unwrap();

        let by_price = ListItemsParams {
            ordering: SortKey::parse_list(Some("price")),
            ..ListItemsParams::default()
        };
        let page = svc.list_items(&by_price).await.unwrap();
        assert_eq!(names(&page), ["c", "a", "b"]);

        let by_name_desc = ListItemsParams {
            ordering: SortKey::parse_list(Some("-name")),
            ..ListItemsParams::default()
        };
        let page = svc.list_items(&by_name_desc).await.unwrap();
        assert_eq!(names(&page), ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn search_matches_name_or_description_ignoring_case() {
        let svc = service(10).await;
        svc.create_item(new_item("Desk Lamp", Some("LED lamp with dimmer"), "19.99"))
            .await
            .unwrap();
        svc.create_item(new_item("Gaming Mouse", Some("High-precision mouse"), "49"))
            .await
            .unwrap();
        svc.create_item(new_item("Monitor Stand", Some("Adjustable DESK stand"), "30"))
            .await
            .unwrap();
        svc.create_item(new_item("T-Shirt", None, "12")).await.unwrap();

        let params = ListItemsParams {
            search: Some("desk".into()),
            ..ListItemsParams::default()
        };
        let page = svc.list_items(&params).await.unwrap();
        assert_eq!(names(&page), ["Monitor Stand", "Desk Lamp"]);

        let params = ListItemsParams {
            search: Some("100%".into()),
            ..ListItemsParams::default()
        };
        assert_eq!(svc.list_items(&params).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn equality_filters() {
        let svc = service(10).await;
        svc.create_item(new_item("Jeans", Some("Blue"), "40")).await.unwrap();
        svc.create_item(new_item("Jeans", Some("Black"), "45.50")).await.unwrap();
        svc.create_item(new_item("Shirt", None, "40")).await.unwrap();

        let params = ListItemsParams {
            filters: ItemFilters {
                name: Some("Jeans".into()),
                ..ItemFilters::default()
            },
            ..ListItemsParams::default()
        };
        assert_eq!(svc.list_items(&params).await.unwrap().count, 2);

        let params = ListItemsParams {
            filters: ItemFilters {
                price: Some(Decimal::from_str("40.00").unwrap()),
                ..ItemFilters::default()
            },
            ..ListItemsParams::default()
        };
        let page = svc.list_items(&params).await.unwrap();
        assert_eq!(names(&page), ["Shirt", "Jeans"]);

        let params = ListItemsParams {
            filters: ItemFilters {
                price: Some(Decimal::from_str("45.501").unwrap()),
                ..ItemFilters::default()
            },
            ..ListItemsParams::default()
        };
        assert_eq!(svc.list_items(&params).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn pagination_splits_results() {
        let svc = service(2).await;
        for i in 1..=5 {
            svc.create_item(new_item(&format!("item {i}"), None, "1"))
                .await
                .unwrap();
        }

        let params = ListItemsParams {
            page: 3,
            ..ListItemsParams::default()
        };
        let page = svc.list_items(&params).await.unwrap();
        assert_eq!(names(&page), ["item 1"]);
        assert_eq!(page.num_pages, 3);
        assert!(!page.has_next());
        assert!(page.has_previous());

        let params = ListItemsParams {
            page: 4,
            ..ListItemsParams::default()
        };
        assert!(matches!(
            svc.list_items(&params).await,
            Err(ItemError::InvalidPage(4))
        ));
    }

    #[tokio::test]
    async fn first_page_of_empty_listing_exists() {
        let svc = service(10).await;

        let page = svc.list_items(&ListItemsParams::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.num_pages, 1);
    }

    #[test]
    fn ordering_parse_drops_unknown_fields() {
        assert_eq!(
            SortKey::parse_list(Some("-price, bogus,name")),
            vec![
                SortKey {
                    field: OrderField::Price,
                    descending: true
                },
                SortKey {
                    field: OrderField::Name,
                    descending: false
                },
            ]
        );
        assert_eq!(SortKey::parse_list(Some("id")), vec![SortKey::DEFAULT]);
        assert_eq!(SortKey::parse_list(None), vec![SortKey::DEFAULT]);
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }
}
