//! Validation variants that turn JSON payloads into item writes.
//!
//! - [`CreateItem`]: `name` and `price` required, `description` optional.
//! - [`UpdateItem`]: every field optional, absent fields stay untouched.
//! - Read: the `Serialize` impl on [`crate::models::item::Item`].
//!
//! Variants never stop at the first bad field. Every problem is collected
//! into [`FieldErrors`], keyed by field name.

use crate::models::item::{
    DESCRIPTION_MAX_CHARS, MAX_PRICE_CENTS, NAME_MAX_CHARS, PRICE_SCALE, price_from_cents,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// A decoded JSON request body.
pub type Payload = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_A_STRING: &str = "Not a valid string.";
const NAME_EMPTY: &str = "Name cannot be empty";
const NAME_TOO_LONG: &str = "Name must be 100 characters or less.";
const DESCRIPTION_TOO_LONG: &str = "Description must be 1000 characters or less.";
const PRICE_INVALID: &str = "Price must be a valid decimal number";
const PRICE_TOO_PRECISE: &str = "Ensure that there are no more than 2 decimal places.";
const PRICE_NOT_POSITIVE: &str = "Price must be greater than zero.";
const PRICE_TOO_LARGE: &str = "Price cannot exceed $9,999,999.99";

/// Field-keyed validation messages.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Errors holding one message for one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`, empty when the field passed.
    #[cfg(test)]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid input for {}", fields.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

/// A validation variant built from a request payload.
pub trait ItemPayload: Sized {
    fn from_payload(payload: &Payload) -> Result<Self, FieldErrors>;
}

/// Validated input of the create operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl ItemPayload for CreateItem {
    fn from_payload(payload: &Payload) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = match payload.get("name") {
            Some(value) => validate_name(value, &mut errors),
            None => {
                errors.add("name", REQUIRED);
                None
            }
        };
        let description = match payload.get("description") {
            Some(value) => validate_description(value, &mut errors),
            None => Some(None),
        };
        let price = match payload.get("price") {
            Some(value) => validate_price(value, &mut errors),
            None => {
                errors.add("price", REQUIRED);
                None
            }
        };

        match (name, description, price) {
            (Some(name), Some(description), Some(price)) => Ok(Self {
                name,
                description,
                price,
            }),
            _ => Err(errors),
        }
    }
}

/// Validated input of the replace and partial-update operations.
///
/// `description` distinguishes "absent" (`None`) from "set to null"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
}

impl ItemPayload for UpdateItem {
    fn from_payload(payload: &Payload) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = payload
            .get("name")
            .and_then(|value| validate_name(value, &mut errors));
        let description = payload
            .get("description")
            .and_then(|value| validate_description(value, &mut errors));
        let price = payload
            .get("price")
            .and_then(|value| validate_price(value, &mut errors));

        if errors.is_empty() {
            Ok(Self {
                name,
                description,
                price,
            })
        } else {
            Err(errors)
        }
    }
}

/// Accept only JSON objects as request bodies.
pub fn payload_from_json(value: Value) -> Result<Payload, FieldErrors> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FieldErrors::single(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_kind(&other)
            ),
        )),
    }
}

/// Parse a decimal written plainly (`"19.99"`) or in scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Coerce a JSON number or numeric string into a storable price.
pub fn coerce_price(value: &Value) -> Result<Decimal, &'static str> {
    let parsed = match value {
        Value::Null => return Err(NOT_NULL),
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text),
        _ => None,
    }
    .ok_or(PRICE_INVALID)?;

    // Trailing zeros count as written digits: "1.230" has three.
    if parsed.scale() > PRICE_SCALE {
        return Err(PRICE_TOO_PRECISE);
    }
    if parsed <= Decimal::ZERO {
        return Err(PRICE_NOT_POSITIVE);
    }
    if parsed > price_from_cents(MAX_PRICE_CENTS) {
        return Err(PRICE_TOO_LARGE);
    }

    let mut price = parsed;
    price.rescale(PRICE_SCALE);
    Ok(price)
}

fn validate_name(value: &Value, errors: &mut FieldErrors) -> Option<String> {
    let raw = text_value("name", value, errors)?;
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", NAME_EMPTY);
        return None;
    }
    if name.chars().count() > NAME_MAX_CHARS {
        errors.add("name", NAME_TOO_LONG);
        return None;
    }
    Some(name.to_string())
}

fn validate_description(value: &Value, errors: &mut FieldErrors) -> Option<Option<String>> {
    if value.is_null() {
        return Some(None);
    }
    let raw = text_value("description", value, errors)?;
    let description = raw.trim();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.add("description", DESCRIPTION_TOO_LONG);
        return None;
    }
    Some(Some(description.to_string()))
}

fn validate_price(value: &Value, errors: &mut FieldErrors) -> Option<Decimal> {
    match coerce_price(value) {
        Ok(price) => Some(price),
        Err(message) => {
            errors.add("price", message);
            None
        }
    }
}

/// Text fields take strings, and numbers in their printed form.
fn text_value(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null => {
            errors.add(field, NOT_NULL);
            None
        }
        _ => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
