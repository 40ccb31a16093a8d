//! Sample data for local development.

use crate::{
    models::item::{Item, price_from_cents},
    serializers::CreateItem,
    services::item_service::{ItemResult, ItemService},
};
use rand::Rng;

const SAMPLE_ITEMS: [(&str, &str); 15] = [
    ("MacBook Pro", "Apple laptop with M2 chip"),
    ("iPhone 15", "Latest iPhone model"),
    ("Rust Book", "Learn Rust development"),
    ("Python Guide", "Complete Python programming guide"),
    ("T-Shirt", "Comfortable cotton t-shirt"),
    ("Jeans", "Blue denim jeans"),
    ("Coffee Maker", "Automatic coffee brewing machine"),
    ("Basketball", "Professional basketball"),
    ("Tennis Racket", "Professional tennis racket"),
    ("LEGO Set", "Building blocks for creativity"),
    ("Wireless Headphones", "Noise-cancelling headphones"),
    ("Gaming Mouse", "High-precision gaming mouse"),
    ("Mechanical Keyboard", "RGB mechanical keyboard"),
    ("Monitor Stand", "Adjustable monitor stand"),
    ("Desk Lamp", "LED desk lamp with dimmer"),
];

/// Seeded prices fall in 10.00..=999.99.
const MIN_SEED_CENTS: i64 = 1_000;
const MAX_SEED_CENTS: i64 = 99_999;

/// Insert `count` sample items, cycling through the sample catalog.
///
/// Item `i` (1-based) is named `"<sample> i"` and priced at random.
pub async fn seed_items<R: Rng>(
    service: &ItemService,
    count: u32,
    rng: &mut R,
) -> ItemResult<Vec<Item>> {
    let mut created = Vec::with_capacity(count as usize);

    for i in 0..count as usize {
        let (name, description) = SAMPLE_ITEMS[i % SAMPLE_ITEMS.len()];
        let cents = rng.random_range(MIN_SEED_CENTS..=MAX_SEED_CENTS);

        let item = service
            .create_item(CreateItem {
                name: format!("{} {}", name, i + 1),
                description: Some(format!("{} - Item #{}", description, i + 1)),
                price: price_from_cents(cents),
            })
            .await?;
        created.push(item);
    }

    tracing::info!("Successfully created {} items", created.len());
    Ok(created)
}
