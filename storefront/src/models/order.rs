// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::capacity::Category;

/// Where an order stands in the delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
  Paid,
  Reviewing,
  Making,
  ReadyForDelivery,
  Confirmed,
  Delivered,
  Cancelled,
}

impl DeliveryStatus {
  pub const ALL: [DeliveryStatus; 7] = [
    DeliveryStatus::Paid,
    DeliveryStatus::Reviewing,
    DeliveryStatus::Making,
    DeliveryStatus::ReadyForDelivery,
    DeliveryStatus::Confirmed,
    DeliveryStatus::Delivered,
    DeliveryStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DeliveryStatus::Paid => "PAID",
      DeliveryStatus::Reviewing => "REVIEWING",
      DeliveryStatus::Making => "MAKING",
      DeliveryStatus::ReadyForDelivery => "READY_FOR_DELIVERY",
      DeliveryStatus::Confirmed => "CONFIRMED",
      DeliveryStatus::Delivered => "DELIVERED",
      DeliveryStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
  }
}

impl fmt::Display for DeliveryStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DeliveryStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DeliveryStatus::ALL
      .iter()
      .copied()
      .find(|status| status.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| format!("unknown delivery status '{}'", s))
  }
}

/// Sub-state tracking a customer's request to move the delivery date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReschedulingStatus {
  None,
  Requested,
  Approved,
  Rejected,
}

impl ReschedulingStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReschedulingStatus::None => "NONE",
      ReschedulingStatus::Requested => "REQUESTED",
      ReschedulingStatus::Approved => "APPROVED",
      ReschedulingStatus::Rejected => "REJECTED",
    }
  }
}

impl fmt::Display for ReschedulingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReschedulingStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "NONE" => Ok(ReschedulingStatus::None),
      "REQUESTED" => Ok(ReschedulingStatus::Requested),
      "APPROVED" => Ok(ReschedulingStatus::Approved),
      "REJECTED" => Ok(ReschedulingStatus::Rejected),
      other => Err(format!("unknown rescheduling status '{}'", other)),
    }
  }
}

/// Role tag recorded on every audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
  Admin,
  Customer,
  System,
}

impl ActorRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActorRole::Admin => "admin",
      ActorRole::Customer => "customer",
      ActorRole::System => "system",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

impl OrderItem {
  pub fn line_total_cents(&self) -> i64 {
    i64::from(self.quantity) * self.unit_price_cents
  }
}

/// One immutable entry of an order's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
  pub status: DeliveryStatus,
  pub changed_by: ActorRole,
  pub changed_at: DateTime<Utc>,
  pub notes: String,
}

/// The order aggregate.
///
/// `items`, `total_cents` and `customer_id` are fixed at creation. Delivery
/// fields change only through `fulfillment::delivery_state`, which also
/// appends to `status_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub customer_id: Uuid,
  pub category: Category,
  pub items: Vec<OrderItem>,
  pub total_cents: i64,
  pub delivery_status: DeliveryStatus,
  pub delivery_date: Option<DateTime<Utc>>,
  pub delivery_confirmed: bool,
  pub rescheduling_status: ReschedulingStatus,
  pub rescheduling_reason: Option<String>,
  pub status_history: Vec<StatusEntry>,
  /// Bumped by every persisted change; guards concurrent writers.
  pub version: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// A freshly paid order with its opening audit entry.
  pub fn new_paid(customer_id: Uuid, category: Category, items: Vec<OrderItem>, now: DateTime<Utc>) -> Self {
    let total_cents = items.iter().map(OrderItem::line_total_cents).sum();
    Self {
      id: Uuid::new_v4(),
      customer_id,
      category,
      items,
      total_cents,
      delivery_status: DeliveryStatus::Paid,
      delivery_date: None,
      delivery_confirmed: false,
      rescheduling_status: ReschedulingStatus::None,
      rescheduling_reason: None,
      status_history: vec![StatusEntry {
        status: DeliveryStatus::Paid,
        changed_by: ActorRole::System,
        changed_at: now,
        notes: "Order placed and payment captured".to_string(),
      }],
      version: 0,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn total_display(&self) -> String {
    format!("${:.2}", self.total_cents as f64 / 100.0)
  }
}
