// storefront/src/store/memory.rs

//! In-process store with the same atomicity guarantees as `PgStore`: every
//! trait method runs under one mutex acquisition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{AdmissionPlan, AdmitOutcome, FulfillmentStore};
use crate::errors::{AdmissionDenial, AppError, Result as AppResult};
use crate::fulfillment::capacity_ledger;
use crate::models::{CapacitySettings, CapacityWindow, DeliveryStatus, Notification, Order, Product};
use crate::services::NotificationSink;

#[derive(Debug)]
struct Inner {
  window: CapacityWindow,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
  notifications: Vec<Notification>,
}

#[derive(Debug)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new(window: CapacityWindow) -> Self {
    Self {
      inner: Mutex::new(Inner {
        window,
        products: HashMap::new(),
        orders: HashMap::new(),
        notifications: Vec::new(),
      }),
    }
  }

  pub fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
    {
      let mut inner = self.inner.lock();
      for product in products {
        inner.products.insert(product.id, product);
      }
    }
    self
  }

  /// Overwrites the stored window, e.g. to preload counters.
  pub fn replace_window(&self, window: CapacityWindow) {
    self.inner.lock().window = window;
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self.inner.lock().notifications.clone()
  }
}

#[async_trait]
impl NotificationSink for MemoryStore {
  async fn send(&self, notification: &Notification) -> AppResult<()> {
    self.inner.lock().notifications.push(notification.clone());
    Ok(())
  }
}

#[async_trait]
impl FulfillmentStore for MemoryStore {
  async fn load_capacity(&self) -> AppResult<CapacityWindow> {
    Ok(self.inner.lock().window.clone())
  }

  async fn roll_capacity_window(&self, observed_start: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<bool> {
    let mut inner = self.inner.lock();
    if inner.window.week_start_date != observed_start {
      return Ok(false);
    }
    inner.window.reset_counters(now);
    inner.window.version += 1;
    Ok(true)
  }

  async fn update_capacity_settings(&self, settings: &CapacitySettings) -> AppResult<CapacityWindow> {
    let mut inner = self.inner.lock();
    inner.window.apply_settings(settings);
    inner.window.version += 1;
    Ok(inner.window.clone())
  }

  async fn load_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
    Ok(self.inner.lock().products.get(&product_id).cloned())
  }

  async fn upsert_product(&self, product: &Product) -> AppResult<()> {
    self.inner.lock().products.insert(product.id, product.clone());
    Ok(())
  }

  async fn insert_admitted_order(&self, order: &Order, plan: &AdmissionPlan) -> AppResult<AdmitOutcome> {
    let mut inner = self.inner.lock();

    if !inner.window.is_store_active {
      return Ok(AdmitOutcome::Denied(AdmissionDenial::StoreInactive));
    }
    if plan.gates.iter().any(|c| inner.window.current(*c) >= inner.window.max(*c)) {
      return Ok(AdmitOutcome::Denied(AdmissionDenial::OrderLimitReached));
    }

    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for item in &order.items {
      *requested.entry(item.product_id).or_default() += item.quantity;
    }
    for (product_id, quantity) in &requested {
      let product = inner
        .products
        .get(product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
      if product.available < *quantity {
        return Ok(AdmitOutcome::Denied(AdmissionDenial::StockInsufficient));
      }
    }
    if inner.orders.contains_key(&order.id) {
      return Err(AppError::Conflict(format!("Order {} already exists", order.id)));
    }

    capacity_ledger::record_admission(&mut inner.window, plan);
    inner.window.version += 1;
    for (product_id, quantity) in requested {
      if let Some(product) = inner.products.get_mut(&product_id) {
        product.available -= quantity;
        product.updated_at = order.created_at;
      }
    }
    inner.orders.insert(order.id, order.clone());
    Ok(AdmitOutcome::Admitted)
  }

  async fn load_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
    Ok(self.inner.lock().orders.get(&order_id).cloned())
  }

  async fn save_order(&self, order: &Order) -> AppResult<Order> {
    let mut inner = self.inner.lock();
    let stored = inner
      .orders
      .get_mut(&order.id)
      .ok_or(AppError::OrderNotFound { order_id: order.id })?;
    if stored.version != order.version {
      return Err(AppError::Conflict(format!(
        "Order {} was modified concurrently (expected version {}, found {})",
        order.id, order.version, stored.version
      )));
    }
    let mut saved = order.clone();
    saved.version += 1;
    *stored = saved.clone();
    Ok(saved)
  }

  async fn list_orders(&self, status: Option<DeliveryStatus>, customer_id: Option<Uuid>) -> AppResult<Vec<Order>> {
    let inner = self.inner.lock();
    let mut orders: Vec<Order> = inner
      .orders
      .values()
      .filter(|o| status.map_or(true, |s| o.delivery_status == s))
      .filter(|o| customer_id.map_or(true, |c| o.customer_id == c))
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(orders)
  }

  async fn list_notifications(&self, unread_only: bool) -> AppResult<Vec<Notification>> {
    let inner = self.inner.lock();
    Ok(inner
      .notifications
      .iter()
      .rev()
      .filter(|n| !unread_only || !n.is_read)
      .cloned()
      .collect())
  }

  async fn mark_notification_read(&self, notification_id: Uuid) -> AppResult<Notification> {
    let mut inner = self.inner.lock();
    let notification = inner
      .notifications
      .iter_mut()
      .find(|n| n.id == notification_id)
      .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", notification_id)))?;
    notification.is_read = true;
    Ok(notification.clone())
  }
}
