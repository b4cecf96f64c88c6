// storefront/src/pipelines/contexts.rs

//! Data structs the fulfillment pipelines run over. Handlers receive them
//! wrapped in `stepflow::ContextData`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::fulfillment::delivery_state::Transition;
use crate::fulfillment::service::OrderRequest;
use crate::models::{ActorRole, CapacityWindow, Category, NotificationKind, Order, Product};
use crate::state::AppState;
use crate::store::AdmissionPlan;

/// One requested product after duplicates were merged and the product loaded.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
  pub product: Product,
  pub quantity: i32,
}

/// Underlying data of the order admission pipeline.
#[derive(Clone)]
pub struct AdmissionCtxData {
  pub app_state: AppState,
  pub auth: AuthContext,
  pub request: OrderRequest,
  /// Captured once per request; every timestamp of the run uses it.
  pub now: DateTime<Utc>,

  pub customer_id: Option<Uuid>,
  pub lines: Vec<ResolvedLine>,
  pub categories: Vec<Category>,
  pub window: Option<CapacityWindow>,
  pub plan: Option<AdmissionPlan>,
  pub order: Option<Order>,
  pub payment_captured: bool,
  pub notification_dispatched: bool,
}

impl AdmissionCtxData {
  pub fn new(app_state: AppState, auth: AuthContext, request: OrderRequest, now: DateTime<Utc>) -> Self {
    Self {
      app_state,
      auth,
      request,
      now,
      customer_id: None,
      lines: Vec::new(),
      categories: Vec::new(),
      window: None,
      plan: None,
      order: None,
      payment_captured: false,
      notification_dispatched: false,
    }
  }
}

/// Underlying data of the delivery transition pipeline.
#[derive(Clone)]
pub struct TransitionCtxData {
  pub app_state: AppState,
  pub auth: AuthContext,
  pub order_id: Uuid,
  pub transition: Transition,
  pub now: DateTime<Utc>,

  /// Loaded, then mutated in place, then replaced by the persisted copy.
  pub order: Option<Order>,
  pub notification_dispatched: bool,
}

impl TransitionCtxData {
  pub fn new(app_state: AppState, auth: AuthContext, order_id: Uuid, transition: Transition, now: DateTime<Utc>) -> Self {
    Self {
      app_state,
      auth,
      order_id,
      transition,
      now,
      order: None,
      notification_dispatched: false,
    }
  }
}

/// Input of the shared notification step.
#[derive(Clone)]
pub struct NotifyCtxData {
  pub app_state: AppState,
  pub kind: NotificationKind,
  pub order: Order,
  pub actor: ActorRole,
  pub now: DateTime<Utc>,
}
