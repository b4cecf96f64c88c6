// storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use stepflow::FlowError;

/// The specific factor that kept an order out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDenial {
  OrderLimitReached,
  StockInsufficient,
  StoreInactive,
}

impl AdmissionDenial {
  pub fn as_str(&self) -> &'static str {
    match self {
      AdmissionDenial::OrderLimitReached => "order_limit_reached",
      AdmissionDenial::StockInsufficient => "stock_insufficient",
      AdmissionDenial::StoreInactive => "store_inactive",
    }
  }

  fn user_message(&self) -> &'static str {
    match self {
      AdmissionDenial::OrderLimitReached => "We are fully booked for this week. Please try again next week.",
      AdmissionDenial::StockInsufficient => "Not enough stock for the requested quantity. Please pick fewer units.",
      AdmissionDenial::StoreInactive => "The store is not accepting orders right now.",
    }
  }
}

impl fmt::Display for AdmissionDenial {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Admission denied: {reason}")]
  AdmissionDenied { reason: AdmissionDenial },

  #[error("Invalid transition from {from} to {to}")]
  InvalidTransition { from: String, to: String },

  #[error("Order not found: {order_id}")]
  OrderNotFound { order_id: Uuid },

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Validation Error on '{field}': {message}")]
  Validation { field: String, message: String },

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Concurrent modification: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Persistence Error: {0}")]
  Persistence(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    AppError::Validation {
      field: field.into(),
      message: message.into(),
    }
  }

  /// The denial reason, when this is an admission failure.
  pub fn admission_denial(&self) -> Option<AdmissionDenial> {
    match self {
      AppError::AdmissionDenied { reason } => Some(*reason),
      _ => None,
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::AdmissionDenied { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::InvalidTransition { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
      AppError::OrderNotFound { .. } | AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Persistence(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(application_error = %self, "Responding with client error");
    }

    let body = match self {
      AppError::AdmissionDenied { reason } => json!({
        "error": reason.user_message(),
        "reason": reason,
      }),
      AppError::InvalidTransition { from, to } => json!({
        "error": self.to_string(),
        "from": from,
        "to": to,
      }),
      AppError::OrderNotFound { order_id } => json!({"error": "Order not found", "orderId": order_id}),
      AppError::Validation { field, message } => json!({"error": message, "field": field}),
      AppError::NotFound(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::Conflict(m) => {
        json!({"error": m})
      }
      AppError::Payment(m) => json!({"error": "Payment was not captured", "detail": m}),
      AppError::Sqlx(_) | AppError::Persistence(_) => json!({"error": "Database operation failed"}),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({"error": "Workflow processing error"})
      }
      AppError::Config(_) | AppError::Internal(_) => json!({"error": "An internal error occurred"}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
