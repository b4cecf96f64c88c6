// storefront/src/pipelines/mod.rs

//! Defines and registers the fulfillment pipelines.

use crate::errors::AppError;
use crate::state::AppState;
use std::sync::Arc;
use stepflow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod admission_pipeline;
pub mod transition_pipeline;

/// Registers every pipeline with `registry`. Called once while building
/// `AppState`.
pub fn register_all_pipelines(registry: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering fulfillment pipelines...");

  admission_pipeline::register_admission_pipeline(registry, app_state);
  transition_pipeline::register_transition_pipeline(registry, app_state);

  tracing::info!("All fulfillment pipelines registered.");
}
