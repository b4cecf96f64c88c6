// storefront/src/pipelines/admission_pipeline.rs

//! Order admission: every check runs before anything is written, and the
//! write itself re-checks capacity and stock atomically. A rejected order
//! leaves no trace.

use std::sync::Arc;

use stepflow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::fulfillment::{capacity_ledger, stock_guard};
use crate::models::{ActorRole, NotificationKind, Order, OrderItem};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{AdmissionCtxData, NotifyCtxData, ResolvedLine};
use crate::state::AppState;
use crate::store::AdmitOutcome;

pub fn register_admission_pipeline(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<AdmissionCtxData, AppError>::new(&[
    ("validate_order_request", false, None),
    ("roll_capacity_window", false, None),
    ("check_capacity", false, None),
    ("check_stock", false, None),
    ("build_order_record", false, None),
    ("capture_payment", false, None),
    ("persist_admitted_order", false, None),
    ("dispatch_new_order_notification", true, None),
  ]);

  p.on_root("validate_order_request", validate_order_request);
  p.on_root("roll_capacity_window", roll_capacity_window);
  p.on_root("check_capacity", check_capacity);
  p.on_root("check_stock", check_stock);
  p.on_root("build_order_record", build_order_record);
  p.on_root("capture_payment", capture_payment);
  p.on_root("persist_admitted_order", persist_admitted_order);
  p.on_root("dispatch_new_order_notification", |ctx_data: ContextData<AdmissionCtxData>| {
    Box::pin(async move {
      let notify_ctx = {
        let guard = ctx_data.read();
        match &guard.order {
          Some(order) => NotifyCtxData {
            app_state: guard.app_state.clone(),
            kind: NotificationKind::NewOrder,
            order: order.clone(),
            actor: ActorRole::Customer,
            now: guard.now,
          },
          None => {
            warn!("No admitted order in context; skipping new-order notification.");
            return Ok::<_, AppError>(PipelineControl::Continue);
          }
        }
      };

      let control = common_steps::dispatch_order_notification_step(ContextData::new(notify_ctx)).await?;
      ctx_data.write().notification_dispatched = true;
      Ok(control)
    })
  });

  registry.register_pipeline(p);
  info!("Order admission pipeline registered.");
}

/// Checks the caller and the line items, merges duplicate products and loads
/// each product once.
#[instrument(name = "admission::validate_order_request", skip_all, err(Display))]
async fn validate_order_request(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let (store, auth, request) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.auth, guard.request.clone())
  };

  if auth.role != ActorRole::Customer {
    return Err(AppError::Forbidden("Only customers can place orders.".to_string()));
  }
  let customer_id = request.customer_id.unwrap_or(auth.subject);
  if customer_id != auth.subject {
    return Err(AppError::Forbidden("Customers can only order for themselves.".to_string()));
  }
  if request.items.is_empty() {
    return Err(AppError::validation("items", "At least one item is required."));
  }

  let mut merged: Vec<(uuid::Uuid, i32)> = Vec::with_capacity(request.items.len());
  for line in &request.items {
    if line.quantity < 1 {
      return Err(AppError::validation("quantity", "Quantity must be at least 1."));
    }
    match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
      Some((_, quantity)) => {
        *quantity = quantity
          .checked_add(line.quantity)
          .ok_or_else(|| AppError::validation("quantity", "Quantity is too large."))?;
      }
      None => merged.push((line.product_id, line.quantity)),
    }
  }

  let mut lines = Vec::with_capacity(merged.len());
  let mut categories = vec![request.category];
  for (product_id, quantity) in merged {
    let product = store
      .load_product(product_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
    if !categories.contains(&product.category) {
      categories.push(product.category);
    }
    lines.push(ResolvedLine { product, quantity });
  }

  debug!(lines = lines.len(), categories = ?categories, "Order request validated.");
  {
    let mut guard = ctx_data.write();
    guard.customer_id = Some(customer_id);
    guard.lines = lines;
    guard.categories = categories;
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "admission::roll_capacity_window", skip_all, err(Display))]
async fn roll_capacity_window(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let (store, now) = ctx_data.with(|d| (d.app_state.store.clone(), d.now));
  let window = capacity_ledger::load_current_window(store.as_ref(), now).await?;
  ctx_data.write().window = Some(window);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "admission::check_capacity", skip_all, err(Display))]
async fn check_capacity(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let decision = {
    let guard = ctx_data.read();
    let window = guard
      .window
      .as_ref()
      .ok_or_else(|| AppError::Internal("Capacity window not loaded before capacity check.".to_string()))?;
    capacity_ledger::plan_admission(window, &guard.categories).map_err(|reason| (reason, window.current_week_orders))
  };

  match decision {
    Ok(plan) => {
      debug!(gates = ?plan.gates, "Capacity available.");
      ctx_data.write().plan = Some(plan);
      Ok(PipelineControl::Continue)
    }
    Err((reason, current_week_orders)) => {
      info!(%reason, current_week_orders, "Order refused by capacity ledger.");
      Err(AppError::AdmissionDenied { reason })
    }
  }
}

#[instrument(name = "admission::check_stock", skip_all, err(Display))]
async fn check_stock(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let window = guard
    .window
    .as_ref()
    .ok_or_else(|| AppError::Internal("Capacity window not loaded before stock check.".to_string()))?;

  for line in &guard.lines {
    if let Err(reason) = stock_guard::check(&line.product, window, line.quantity) {
      info!(
        product_id = %line.product.id,
        requested = line.quantity,
        sellable = stock_guard::sellable_quantity(&line.product, window),
        "Order refused by stock guard."
      );
      return Err(AppError::AdmissionDenied { reason });
    }
  }
  Ok(PipelineControl::Continue)
}

/// Prices the lines from the loaded products and creates the PAID order.
#[instrument(name = "admission::build_order_record", skip_all, err(Display))]
async fn build_order_record(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let customer_id = guard
    .customer_id
    .ok_or_else(|| AppError::Internal("Customer not resolved before building the order.".to_string()))?;
  let items: Vec<OrderItem> = guard
    .lines
    .iter()
    .map(|line| OrderItem {
      product_id: line.product.id,
      quantity: line.quantity,
      unit_price_cents: line.product.price_cents,
    })
    .collect();

  let order = Order::new_paid(customer_id, guard.request.category, items, guard.now);
  debug!(order_id = %order.id, total_cents = order.total_cents, "Order record built.");
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "admission::capture_payment", skip_all, err(Display))]
async fn capture_payment(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let (payments, order_id) = {
    let guard = ctx_data.read();
    (guard.app_state.payments.clone(), guard.order.as_ref().map(|o| o.id))
  };
  let order_id =
    order_id.ok_or_else(|| AppError::Internal("Order not built before payment capture.".to_string()))?;

  if !payments.capture(order_id).await? {
    warn!(%order_id, "Payment was not captured; order will not be admitted.");
    return Err(AppError::Payment(format!("Payment for order {} was declined.", order_id)));
  }
  ctx_data.write().payment_captured = true;
  Ok(PipelineControl::Continue)
}

/// The authoritative write: counters, stock and the order row together.
#[instrument(name = "admission::persist_admitted_order", skip_all, err(Display))]
async fn persist_admitted_order(ctx_data: ContextData<AdmissionCtxData>) -> AppResult<PipelineControl> {
  let (store, order, plan) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.order.clone(), guard.plan.clone())
  };
  let (order, plan) = match (order, plan) {
    (Some(order), Some(plan)) => (order, plan),
    _ => return Err(AppError::Internal("Order or admission plan missing at persist time.".to_string())),
  };

  match store.insert_admitted_order(&order, &plan).await? {
    AdmitOutcome::Admitted => {
      info!(order_id = %order.id, customer_id = %order.customer_id, "Order persisted as PAID.");
      Ok(PipelineControl::Continue)
    }
    AdmitOutcome::Denied(reason) => {
      // Capture already happened; the refund is out of band.
      warn!(
        order_id = %order.id,
        %reason,
        "Payment captured but the order lost the admission race at write time."
      );
      Err(AppError::AdmissionDenied { reason })
    }
  }
}
