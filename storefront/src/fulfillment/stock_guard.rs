// storefront/src/fulfillment/stock_guard.rs

//! Per-product stock check. It reserves nothing: the authoritative decrement
//! happens in the admission write, guarded by `available >= quantity`.

use crate::errors::AdmissionDenial;
use crate::models::{CapacityWindow, Counter, Product};

/// How many units of `product` may be sold at most.
///
/// A product's own limit wins; otherwise the weekly ceiling of its category
/// applies when that category limit is switched on.
pub fn effective_limit(product: &Product, window: &CapacityWindow) -> Option<i32> {
  if product.is_stock_limit_active {
    return Some(product.max_stock);
  }
  let category_counter = Counter::for_category(product.category);
  window
    .is_active(category_counter)
    .then(|| window.max(category_counter))
}

/// Units currently offered for sale: raw inventory capped by the limit.
pub fn sellable_quantity(product: &Product, window: &CapacityWindow) -> i32 {
  let available = product.available.max(0);
  match effective_limit(product, window) {
    Some(limit) => available.min(limit.max(0)),
    None => available,
  }
}

pub fn has_available_stock(product: &Product, window: &CapacityWindow, requested_qty: i32) -> bool {
  requested_qty <= sellable_quantity(product, window)
}

pub fn check(product: &Product, window: &CapacityWindow, requested_qty: i32) -> Result<(), AdmissionDenial> {
  if has_available_stock(product, window, requested_qty) {
    Ok(())
  } else {
    Err(AdmissionDenial::StockInsufficient)
  }
}
