// storefront/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fulfillment events that produce a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  NewOrder,
  DeliveryScheduled,
  DeliveryConfirmed,
  RescheduleRequested,
  RescheduleApproved,
  RescheduleRejected,
  StatusChanged,
}

impl NotificationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NotificationKind::NewOrder => "new_order",
      NotificationKind::DeliveryScheduled => "delivery_scheduled",
      NotificationKind::DeliveryConfirmed => "delivery_confirmed",
      NotificationKind::RescheduleRequested => "reschedule_requested",
      NotificationKind::RescheduleApproved => "reschedule_approved",
      NotificationKind::RescheduleRejected => "reschedule_rejected",
      NotificationKind::StatusChanged => "status_changed",
    }
  }

  /// Anything that needs an admin to act is `High`.
  pub fn priority(&self) -> Priority {
    match self {
      NotificationKind::NewOrder | NotificationKind::RescheduleRequested => Priority::High,
      _ => Priority::Normal,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      NotificationKind::NewOrder => "New order received",
      NotificationKind::DeliveryScheduled => "Delivery scheduled",
      NotificationKind::DeliveryConfirmed => "Delivery confirmed",
      NotificationKind::RescheduleRequested => "Reschedule requested",
      NotificationKind::RescheduleApproved => "Reschedule approved",
      NotificationKind::RescheduleRejected => "Reschedule rejected",
      NotificationKind::StatusChanged => "Order status updated",
    }
  }

  pub fn icon(&self) -> &'static str {
    match self {
      NotificationKind::NewOrder => "shopping-bag",
      NotificationKind::DeliveryScheduled => "truck",
      NotificationKind::DeliveryConfirmed => "check-circle",
      NotificationKind::RescheduleRequested => "calendar-clock",
      NotificationKind::RescheduleApproved => "calendar-check",
      NotificationKind::RescheduleRejected => "calendar-x",
      NotificationKind::StatusChanged => "refresh-cw",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Normal,
}

impl Priority {
  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::High => "high",
      Priority::Normal => "normal",
    }
  }
}

/// Which side of the store a notice is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
  Admin,
  Customer,
}

impl Audience {
  pub fn as_str(&self) -> &'static str {
    match self {
      Audience::Admin => "admin",
      Audience::Customer => "customer",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: Uuid,
  pub title: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub priority: Priority,
  pub audience: Audience,
  pub is_read: bool,
  pub data: serde_json::Value,
  pub icon: String,
  pub created_at: DateTime<Utc>,
}
