//! Represents a catalog item, the only entity the service manages.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Row, sqlite::SqliteRow};

/// Maximum length of `name`, in characters.
pub const NAME_MAX_CHARS: usize = 100;

/// Maximum length of `description`, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Number of fractional digits kept for prices.
pub const PRICE_SCALE: u32 = 2;

/// Largest storable price (9,999,999.99) in hundredths.
pub const MAX_PRICE_CENTS: i64 = 999_999_999;

/// Column list shared by every query that materializes an [`Item`].
pub const ITEM_COLUMNS: &str = "id, name, description, price_cents, created_at, updated_at";

/// A single catalog item.
///
/// The `Serialize` impl is the read representation returned by every
/// endpoint: prices render as fixed two-digit strings (`"19.99"`) and
/// timestamps as RFC 3339.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Item {
    /// System-assigned primary key.
    pub id: i64,

    /// Display name (1–100 characters).
    pub name: String,

    /// Free-form description, at most 1000 characters.
    pub description: Option<String>,

    /// Unit price, always positive with scale 2.
    pub price: Decimal,

    /// When the item was created. Never changes afterwards.
    pub created_at: DateTime<Utc>,

    /// When the item was last written.
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Item {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: price_from_cents(row.try_get("price_cents")?),
            created_at: decode_timestamp(row, "created_at")?,
            updated_at: decode_timestamp(row, "updated_at")?,
        })
    }
}

/// Convert stored hundredths into a scale-2 decimal.
pub fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, PRICE_SCALE)
}

/// Convert a price into hundredths, rounding extra fractional digits.
///
/// Returns `None` when the value does not fit an `i64`.
pub fn price_to_cents(price: Decimal) -> Option<i64> {
    let mut scaled = price;
    scaled.rescale(PRICE_SCALE);
    i64::try_from(scaled.mantissa()).ok()
}

/// Current time truncated to the precision the store keeps.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Storage text form of a timestamp.
///
/// Fixed microsecond precision keeps lexical order equal to time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(err),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn price_serializes_with_two_digits() {
        let item = Item {
            id: 1,
            name: "Desk Lamp".into(),
            description: None,
            price: price_from_cents(1000),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["price"], "10.00");
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn cents_conversion_rounds_to_scale() {
        assert_eq!(price_to_cents(Decimal::from_str("19.99").unwrap()), Some(1999));
        assert_eq!(price_to_cents(Decimal::from_str("5").unwrap()), Some(500));
        assert_eq!(price_to_cents(Decimal::from_str("0.016").unwrap()), Some(2));
        assert_eq!(price_from_cents(2499).to_string(), "24.99");
    }

    #[test]
    fn storage_timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::microseconds(500_123);

        assert_eq!(format_timestamp(&early), "2024-01-01T00:00:00.500000Z");
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }
}
