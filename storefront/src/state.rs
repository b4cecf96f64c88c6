// storefront/src/state.rs

use std::sync::Arc;
use stepflow::FlowRegistry;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::fulfillment::FulfillmentService;
use crate::pipelines;
use crate::services::{Clock, NotificationDispatcher, NotificationSink, PaymentGateway};
use crate::store::FulfillmentStore;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub store: Arc<dyn FulfillmentStore>,
  pub notifier: NotificationDispatcher,
  pub payments: Arc<dyn PaymentGateway>,
  pub clock: Arc<dyn Clock>,
  pub flows: Arc<FlowRegistry<AppError>>,
}

impl AppState {
  /// Wires the collaborators together and registers all pipelines.
  ///
  /// `sink` is usually the store itself; it is a separate argument so
  /// notifications can be routed elsewhere.
  pub fn new(
    config: Arc<AppConfig>,
    store: Arc<dyn FulfillmentStore>,
    sink: Arc<dyn NotificationSink>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let notifier = NotificationDispatcher::new(sink, config.notify_in_background);
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    let state = Self {
      config,
      store,
      notifier,
      payments,
      clock,
      flows: flows.clone(),
    };
    pipelines::register_all_pipelines(&flows, &state);
    state
  }

  pub fn fulfillment(&self) -> FulfillmentService {
    FulfillmentService::new(self.clone())
  }
}
