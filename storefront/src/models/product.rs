// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::capacity::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub category: Category,
  pub price_cents: i64,
  /// Raw inventory on hand.
  pub available: i32,
  /// Optional ceiling on how much of `available` is offered for sale.
  pub max_stock: i32,
  pub is_stock_limit_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn new(name: impl Into<String>, category: Category, price_cents: i64, available: i32) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      category,
      price_cents,
      available,
      max_stock: 0,
      is_stock_limit_active: false,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn with_stock_limit(mut self, max_stock: i32) -> Self {
    self.max_stock = max_stock;
    self.is_stock_limit_active = true;
    self
  }
}
