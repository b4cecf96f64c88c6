// tests/common/mod.rs
#![allow(dead_code)]

use stepflow::{ContextData, FlowError, PipelineControl};
use tracing::Level;

/// Context used by most engine tests: handlers append to `trail`.
#[derive(Clone, Debug, Default)]
pub struct RunLog {
  pub total: i32,
  pub trail: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("stepflow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Handler that records `step_name` and stops the run when `halt_at` names it.
pub fn recording_handler(step_name: &'static str, amount: i32) -> stepflow::Handler<RunLog, TestError> {
  Box::new(move |ctx: ContextData<RunLog>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total += amount;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, total = guard.total, "executed");
      if guard.halt_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> stepflow::Handler<RunLog, TestError> {
  Box::new(move |ctx: ContextData<RunLog>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
