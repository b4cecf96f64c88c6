// storefront/src/seed.rs

//! Demo catalog loaded at start-up when `SEED_DB=true`. Ids are fixed so
//! reseeding overwrites instead of duplicating.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::Result as AppResult;
use crate::models::{Category, Product};
use crate::store::FulfillmentStore;

pub fn demo_products() -> Vec<Product> {
  let seeds: [(u128, &str, Category, i64, i32, Option<i32>); 4] = [
    (0x5eed_0001, "Classic sourdough loaf", Category::Catalog, 1000, 40, None),
    (0x5eed_0002, "Seasonal fruit tart", Category::Catalog, 2400, 12, Some(6)),
    (0x5eed_0003, "Celebration cake (custom)", Category::CustomOrder, 6500, 5, None),
    (0x5eed_0004, "Wedding cake tasting box", Category::CustomOrder, 3500, 8, Some(2)),
  ];

  let now = Utc::now();
  seeds
    .into_iter()
    .map(|(id, name, category, price_cents, available, limit)| {
      let mut product = Product::new(name, category, price_cents, available);
      product.id = Uuid::from_u128(id);
      product.created_at = now;
      product.updated_at = now;
      match limit {
        Some(max) => product.with_stock_limit(max),
        None => product,
      }
    })
    .collect()
}

pub async fn seed_products(store: &dyn FulfillmentStore) -> AppResult<usize> {
  let products = demo_products();
  for product in &products {
    store.upsert_product(product).await?;
  }
  info!(count = products.len(), "Seeded demo products.");
  Ok(products.len())
}
