//! Core data model of the item catalog.
//!
//! `Item` maps to the `items` table via `sqlx::FromRow` and serializes
//! as the API's read representation via `serde`.

pub mod item;
