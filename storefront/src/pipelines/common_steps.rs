// storefront/src/pipelines/common_steps.rs

use stepflow::{ContextData, PipelineControl};
use tracing::{info, instrument};

use crate::errors::Result as AppResult;
use crate::pipelines::contexts::NotifyCtxData;
use crate::services::NotificationDispatcher;

/// Composes the notice for an order event and hands it to the dispatcher.
///
/// Runs after the change it reports has been persisted. Delivery problems
/// stay inside the dispatcher, so this step always continues.
#[instrument(name = "common_step::dispatch_order_notification", skip(ctx_data), err(Display))]
pub async fn dispatch_order_notification_step(ctx_data: ContextData<NotifyCtxData>) -> AppResult<PipelineControl> {
  let (notifier, notification) = {
    let guard = ctx_data.read();
    (
      guard.app_state.notifier.clone(),
      NotificationDispatcher::compose(guard.kind, &guard.order, guard.actor, guard.now),
    )
  };

  info!(
    kind = notification.kind.as_str(),
    audience = notification.audience.as_str(),
    "Dispatching order notification."
  );
  notifier.dispatch(notification).await;
  Ok(PipelineControl::Continue)
}
