// storefront/src/services/notification_dispatcher.rs

//! Best-effort notices emitted after a fulfillment change has been committed.
//!
//! Nothing here can fail the caller: a sink error is logged and dropped,
//! never retried, and never rolls back the change that produced it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::Result as AppResult;
use crate::models::{ActorRole, Audience, Notification, NotificationKind, Order};

/// Where notification records end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
  async fn send(&self, notification: &Notification) -> AppResult<()>;
}

#[derive(Clone)]
pub struct NotificationDispatcher {
  sink: Arc<dyn NotificationSink>,
  in_background: bool,
}

impl NotificationDispatcher {
  pub fn new(sink: Arc<dyn NotificationSink>, in_background: bool) -> Self {
    Self { sink, in_background }
  }

  /// Builds the notice for `kind` about `order`.
  ///
  /// Actions taken by a customer notify admins and vice versa.
  pub fn compose(kind: NotificationKind, order: &Order, actor: ActorRole, now: DateTime<Utc>) -> Notification {
    let audience = match actor {
      ActorRole::Customer | ActorRole::System => Audience::Admin,
      ActorRole::Admin => Audience::Customer,
    };
    let order_ref = order.id.simple().to_string();
    let order_ref = &order_ref[..8];
    let delivery_date = order
      .delivery_date
      .map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|| "an unscheduled date".to_string());

    let message = match kind {
      NotificationKind::NewOrder => format!("Order #{} was placed for {}.", order_ref, order.total_display()),
      NotificationKind::DeliveryScheduled => format!("Order #{} is scheduled for delivery on {}.", order_ref, delivery_date),
      NotificationKind::DeliveryConfirmed => format!("The customer confirmed delivery of order #{} on {}.", order_ref, delivery_date),
      NotificationKind::RescheduleRequested => format!(
        "The customer asked to reschedule order #{}: {}",
        order_ref,
        order.rescheduling_reason.as_deref().unwrap_or("no reason given")
      ),
      NotificationKind::RescheduleApproved => format!("Order #{} was rescheduled to {}.", order_ref, delivery_date),
      NotificationKind::RescheduleRejected => format!("The reschedule request for order #{} was declined.", order_ref),
      NotificationKind::StatusChanged => format!("Order #{} is now {}.", order_ref, order.delivery_status),
    };

    Notification {
      id: Uuid::new_v4(),
      title: kind.title().to_string(),
      message,
      kind,
      priority: kind.priority(),
      audience,
      is_read: false,
      data: json!({
        "orderId": order.id,
        "customerId": order.customer_id,
        "deliveryStatus": order.delivery_status,
        "deliveryDate": order.delivery_date,
        "reschedulingStatus": order.rescheduling_status,
      }),
      icon: kind.icon().to_string(),
      created_at: now,
    }
  }

  /// Emits `notification`. Failures are logged and swallowed.
  #[instrument(
    name = "notification_dispatcher::dispatch",
    skip(self, notification),
    fields(kind = notification.kind.as_str(), in_background = self.in_background)
  )]
  pub async fn dispatch(&self, notification: Notification) {
    if self.in_background {
      let sink = Arc::clone(&self.sink);
      tokio::spawn(async move { deliver(sink.as_ref(), &notification).await });
    } else {
      deliver(self.sink.as_ref(), &notification).await;
    }
  }
}

async fn deliver(sink: &dyn NotificationSink, notification: &Notification) {
  match sink.send(notification).await {
    Ok(()) => debug!(notification_id = %notification.id, "Notification delivered."),
    Err(e) => warn!(
      notification_id = %notification.id,
      kind = notification.kind.as_str(),
      error = %e,
      "Notification delivery failed; dropping it."
    ),
  }
}
