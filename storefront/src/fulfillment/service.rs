// storefront/src/fulfillment/service.rs

//! Entry point for every fulfillment intent.
//!
//! Mutating intents run as registered `stepflow` pipelines (admission and
//! transition); reads go straight to the store.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use stepflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::{AppError, Result as AppResult};
use crate::fulfillment::capacity_ledger;
use crate::fulfillment::delivery_state::Transition;
use crate::models::{ActorRole, CapacitySettings, CapacityWindow, DeliveryStatus, Notification, Order};
use crate::pipelines::contexts::{AdmissionCtxData, TransitionCtxData};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// A checkout: what the customer wants and under which category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
  /// Defaults to the caller. A customer may only order for themself.
  #[serde(default)]
  pub customer_id: Option<Uuid>,
  pub category: crate::models::Category,
  pub items: Vec<LineRequest>,
}

#[derive(Clone)]
pub struct FulfillmentService {
  state: AppState,
}

impl FulfillmentService {
  pub fn new(state: AppState) -> Self {
    Self { state }
  }

  fn now(&self) -> DateTime<Utc> {
    self.state.clock.now()
  }

  /// Admits and persists a new order, or rejects it as a whole.
  #[instrument(
    name = "fulfillment::place_order",
    skip(self, auth, request),
    fields(subject = %auth.subject, category = %request.category, lines = request.items.len()),
    err(Display)
  )]
  pub async fn place_order(&self, auth: AuthContext, request: OrderRequest) -> AppResult<Order> {
    let ctx_data = ContextData::new(AdmissionCtxData::new(self.state.clone(), auth, request, self.now()));

    match self.state.flows.run(ctx_data.clone()).await {
      Ok(PipelineResult::Completed) => {
        let order = ctx_data.with(|d| d.order.clone()).ok_or_else(|| {
          AppError::Internal("Admission completed but no order was recorded.".to_string())
        })?;
        info!(order_id = %order.id, total = %order.total_display(), "Order admitted.");
        Ok(order)
      }
      Ok(PipelineResult::Stopped) => {
        warn!("Admission pipeline was stopped by a handler.");
        Err(AppError::Internal("Order admission was halted.".to_string()))
      }
      Err(app_err) => Err(app_err),
    }
  }

  /// Runs one delivery transition on `order_id` on behalf of `auth`.
  #[instrument(
    name = "fulfillment::transition",
    skip(self, auth, transition),
    fields(subject = %auth.subject, transition = transition.name()),
    err(Display)
  )]
  pub async fn transition(&self, auth: AuthContext, order_id: Uuid, transition: Transition) -> AppResult<Order> {
    let ctx_data = ContextData::new(TransitionCtxData::new(self.state.clone(), auth, order_id, transition, self.now()));

    match self.state.flows.run(ctx_data.clone()).await {
      Ok(PipelineResult::Completed) => ctx_data
        .with(|d| d.order.clone())
        .ok_or_else(|| AppError::Internal("Transition completed but the order is unavailable.".to_string())),
      Ok(PipelineResult::Stopped) => {
        warn!(%order_id, "Transition pipeline was stopped by a handler.");
        Err(AppError::Internal("Order transition was halted.".to_string()))
      }
      Err(app_err) => Err(app_err),
    }
  }

  pub async fn schedule_delivery(
    &self,
    auth: AuthContext,
    order_id: Uuid,
    date: Option<DateTime<Utc>>,
  ) -> AppResult<Order> {
    self.transition(auth, order_id, Transition::ScheduleDelivery { date }).await
  }

  pub async fn confirm_delivery(&self, auth: AuthContext, order_id: Uuid) -> AppResult<Order> {
    self.transition(auth, order_id, Transition::ConfirmDelivery).await
  }

  pub async fn accept_delivery(&self, auth: AuthContext, order_id: Uuid) -> AppResult<Order> {
    self.transition(auth, order_id, Transition::AcceptDelivery).await
  }

  pub async fn request_reschedule(&self, auth: AuthContext, order_id: Uuid, reason: String) -> AppResult<Order> {
    self.transition(auth, order_id, Transition::RequestReschedule { reason }).await
  }

  pub async fn decide_reschedule(
    &self,
    auth: AuthContext,
    order_id: Uuid,
    approve: bool,
    new_date: Option<DateTime<Utc>>,
  ) -> AppResult<Order> {
    let transition = if approve {
      Transition::ApproveReschedule { new_date }
    } else {
      Transition::RejectReschedule
    };
    self.transition(auth, order_id, transition).await
  }

  pub async fn advance(&self, auth: AuthContext, order_id: Uuid, to_status: DeliveryStatus) -> AppResult<Order> {
    let transition = Transition::advance_to(to_status)?;
    self.transition(auth, order_id, transition).await
  }

  pub async fn cancel(&self, auth: AuthContext, order_id: Uuid, reason: Option<String>) -> AppResult<Order> {
    self.transition(auth, order_id, Transition::Cancel { reason }).await
  }

  pub async fn get_order(&self, auth: AuthContext, order_id: Uuid) -> AppResult<Order> {
    let order = self
      .state
      .store
      .load_order(order_id)
      .await?
      .ok_or(AppError::OrderNotFound { order_id })?;
    if !auth.can_view(&order) {
      return Err(AppError::Forbidden("This order belongs to another customer.".to_string()));
    }
    Ok(order)
  }

  /// Admins list every order; customers get their own.
  pub async fn list_orders(&self, auth: AuthContext, status: Option<DeliveryStatus>) -> AppResult<Vec<Order>> {
    let customer_filter = match auth.role {
      ActorRole::Admin => None,
      _ => Some(auth.subject),
    };
    self.state.store.list_orders(status, customer_filter).await
  }

  /// The current window, rolled over first if it has expired.
  pub async fn capacity_snapshot(&self, auth: AuthContext) -> AppResult<CapacityWindow> {
    auth.require_admin()?;
    capacity_ledger::load_current_window(self.state.store.as_ref(), self.now()).await
  }

  #[instrument(name = "fulfillment::update_capacity", skip(self, auth), err(Display))]
  pub async fn update_capacity(&self, auth: AuthContext, settings: CapacitySettings) -> AppResult<CapacityWindow> {
    auth.require_admin()?;
    if let Some(field) = settings.invalid_field() {
      return Err(AppError::validation(field, "Limits cannot be negative."));
    }
    // Roll first so new limits never apply to last week's counts.
    capacity_ledger::load_current_window(self.state.store.as_ref(), self.now()).await?;
    let window = self.state.store.update_capacity_settings(&settings).await?;
    info!(
      is_store_active = window.is_store_active,
      version = window.version,
      "Capacity settings updated."
    );
    Ok(window)
  }

  pub async fn notifications(&self, auth: AuthContext, unread_only: bool) -> AppResult<Vec<Notification>> {
    auth.require_admin()?;
    self.state.store.list_notifications(unread_only).await
  }

  pub async fn mark_notification_read(&self, auth: AuthContext, notification_id: Uuid) -> AppResult<Notification> {
    auth.require_admin()?;
    self.state.store.mark_notification_read(notification_id).await
  }
}
