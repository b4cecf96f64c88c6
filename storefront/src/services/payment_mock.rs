// storefront/src/services/payment_mock.rs

use crate::errors::Result as AppResult;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// External payment collaborator: reports whether funds for an order were captured.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn capture(&self, order_id: Uuid) -> AppResult<bool>;
}

/// Simulated gateway. Captures everything unless built with `declining`.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
  account_id: String,
  latency: Duration,
  decline: bool,
}

impl MockPaymentGateway {
  pub fn new(account_id: impl Into<String>, latency: Duration) -> Self {
    Self {
      account_id: account_id.into(),
      latency,
      decline: false,
    }
  }

  pub fn declining(account_id: impl Into<String>) -> Self {
    Self {
      account_id: account_id.into(),
      latency: Duration::ZERO,
      decline: true,
    }
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(skip(self), fields(payment_account_id = %self.account_id))]
  async fn capture(&self, order_id: Uuid) -> AppResult<bool> {
    info!("Simulating payment capture for order {}", order_id);
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
    if self.decline {
      warn!("Mock payment DECLINED for order {}", order_id);
      return Ok(false);
    }
    info!("Mock payment captured for order {}", order_id);
    Ok(true)
  }
}
