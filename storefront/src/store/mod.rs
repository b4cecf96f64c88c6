// storefront/src/store/mod.rs

//! Persistence port of the fulfillment subsystem and its implementations.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{AdmissionDenial, Result as AppResult};
use crate::models::{CapacitySettings, CapacityWindow, Counter, DeliveryStatus, Notification, Order, Product};
use crate::services::NotificationSink;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// How one admission touches the capacity counters.
///
/// `gates` are the counters whose ceiling must still have room, checked
/// against the live values at write time. `increments` are bumped by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPlan {
  pub gates: Vec<Counter>,
  pub increments: Vec<Counter>,
}

/// Result of the atomic admission write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
  Admitted,
  Denied(AdmissionDenial),
}

#[async_trait]
pub trait FulfillmentStore: NotificationSink + Send + Sync {
  async fn load_capacity(&self) -> AppResult<CapacityWindow>;

  /// Resets the counters to zero and moves the window start to `now`, but
  /// only if the stored window still starts at `observed_start`. Returns
  /// whether this call performed the reset.
  async fn roll_capacity_window(&self, observed_start: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<bool>;

  async fn update_capacity_settings(&self, settings: &CapacitySettings) -> AppResult<CapacityWindow>;

  async fn load_product(&self, product_id: Uuid) -> AppResult<Option<Product>>;

  async fn upsert_product(&self, product: &Product) -> AppResult<()>;

  /// Gate-and-increment the counters in `plan`, decrement stock for every
  /// item, and insert `order`, as one atomic unit. Nothing is written unless
  /// every guard holds.
  async fn insert_admitted_order(&self, order: &Order, plan: &AdmissionPlan) -> AppResult<AdmitOutcome>;

  async fn load_order(&self, order_id: Uuid) -> AppResult<Option<Order>>;

  /// Writes the whole order document (state fields and history together) if
  /// the stored version still equals `order.version`; bumps the version.
  /// A lost race is `AppError::Conflict`.
  async fn save_order(&self, order: &Order) -> AppResult<Order>;

  async fn list_orders(&self, status: Option<DeliveryStatus>, customer_id: Option<Uuid>) -> AppResult<Vec<Order>>;

  async fn list_notifications(&self, unread_only: bool) -> AppResult<Vec<Notification>>;

  async fn mark_notification_read(&self, notification_id: Uuid) -> AppResult<Notification>;
}
