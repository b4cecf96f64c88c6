// storefront/src/pipelines/transition_pipeline.rs

use std::sync::Arc;

use stepflow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::fulfillment::delivery_state;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{NotifyCtxData, TransitionCtxData};
use crate::state::AppState;

/// Registers the delivery transition pipeline: load, authorize, apply,
/// persist, then notify once the change is committed.
pub fn register_transition_pipeline(registry: &Arc<FlowRegistry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<TransitionCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_actor", false, None),
    ("apply_transition", false, None),
    ("persist_transition", false, None),
    ("dispatch_transition_notification", true, None),
  ]);

  p.on_root("load_order", load_order);
  p.on_root("authorize_actor", authorize_actor);
  p.on_root("apply_transition", apply_transition);
  p.on_root("persist_transition", persist_transition);
  p.on_root("dispatch_transition_notification", |ctx_data: ContextData<TransitionCtxData>| {
    Box::pin(async move {
      let notify_ctx = {
        let guard = ctx_data.read();
        let Some(order) = guard.order.clone() else {
          warn!(order_id = %guard.order_id, "No persisted order in context; skipping notification.");
          return Ok::<_, AppError>(PipelineControl::Continue);
        };
        NotifyCtxData {
          app_state: guard.app_state.clone(),
          kind: guard.transition.notification_kind(),
          order,
          actor: guard.transition.actor(),
          now: guard.now,
        }
      };

      let control = common_steps::dispatch_order_notification_step(ContextData::new(notify_ctx)).await?;
      ctx_data.write().notification_dispatched = true;
      Ok(control)
    })
  });

  registry.register_pipeline(p);
  info!("Delivery transition pipeline registered.");
}

#[instrument(name = "transition::load_order", skip_all, fields(order_id), err(Display))]
async fn load_order(ctx_data: ContextData<TransitionCtxData>) -> AppResult<PipelineControl> {
  let (store, order_id) = ctx_data.with(|d| (d.app_state.store.clone(), d.order_id));
  tracing::Span::current().record("order_id", tracing::field::display(order_id));

  let order = store
    .load_order(order_id)
    .await?
    .ok_or(AppError::OrderNotFound { order_id })?;
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "transition::authorize_actor", skip_all, err(Display))]
async fn authorize_actor(ctx_data: ContextData<TransitionCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let order = guard
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order not loaded before authorization.".to_string()))?;
  guard.auth.authorize(guard.transition.actor(), order)?;
  Ok(PipelineControl::Continue)
}

/// Validates and applies the transition to the in-context copy only; the
/// stored order is untouched until `persist_transition`.
#[instrument(name = "transition::apply_transition", skip_all, err(Display))]
async fn apply_transition(ctx_data: ContextData<TransitionCtxData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let transition = guard.transition.clone();
  let now = guard.now;
  let order = guard
    .order
    .as_mut()
    .ok_or_else(|| AppError::Internal("Order not loaded before applying a transition.".to_string()))?;

  let from = order.delivery_status;
  if let Err(e) = delivery_state::apply(order, &transition, now) {
    info!(order_id = %order.id, transition = transition.name(), error = %e, "Transition rejected.");
    return Err(e.into());
  }
  info!(
    order_id = %order.id,
    transition = transition.name(),
    %from,
    to = %order.delivery_status,
    rescheduling = %order.rescheduling_status,
    "Transition applied."
  );
  Ok(PipelineControl::Continue)
}

/// State fields and the new history entry are written in one versioned update.
#[instrument(name = "transition::persist_transition", skip_all, err(Display))]
async fn persist_transition(ctx_data: ContextData<TransitionCtxData>) -> AppResult<PipelineControl> {
  let (store, order) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.order.clone())
  };
  let order = order.ok_or_else(|| AppError::Internal("Order missing at persist time.".to_string()))?;

  let saved = store.save_order(&order).await?;
  ctx_data.write().order = Some(saved);
  Ok(PipelineControl::Continue)
}
