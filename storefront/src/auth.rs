// storefront/src/auth.rs

//! Caller identity. Authentication itself happens upstream; this crate only
//! reads the resulting subject and role from request headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ActorRole, Order};

pub const SUBJECT_HEADER: &str = "X-User-ID";
pub const ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
  pub subject: Uuid,
  pub role: ActorRole,
}

impl AuthContext {
  pub fn admin(subject: Uuid) -> Self {
    Self {
      subject,
      role: ActorRole::Admin,
    }
  }

  pub fn customer(subject: Uuid) -> Self {
    Self {
      subject,
      role: ActorRole::Customer,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == ActorRole::Admin
  }

  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(AppError::Forbidden("Admin role required.".to_string()))
    }
  }

  /// Admins see every order; customers only their own.
  pub fn can_view(&self, order: &Order) -> bool {
    self.is_admin() || (self.role == ActorRole::Customer && self.subject == order.customer_id)
  }

  /// Checks that this caller may act as `role` on `order`.
  pub fn authorize(&self, role: ActorRole, order: &Order) -> Result<(), AppError> {
    match role {
      ActorRole::Admin => self.require_admin(),
      ActorRole::Customer if self.role == ActorRole::Customer && self.subject == order.customer_id => Ok(()),
      ActorRole::Customer => Err(AppError::Forbidden(
        "Only the customer who placed this order may do that.".to_string(),
      )),
      ActorRole::System => Err(AppError::Forbidden("System transitions cannot be requested.".to_string())),
    }
  }
}

fn parse_headers(req: &HttpRequest) -> Result<AuthContext, AppError> {
  let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

  let subject = header(SUBJECT_HEADER)
    .and_then(|raw| Uuid::parse_str(raw).ok())
    .ok_or_else(|| AppError::Auth(format!("Missing or invalid {} header.", SUBJECT_HEADER)))?;
  let role = match header(ROLE_HEADER).map(str::to_ascii_lowercase).as_deref() {
    Some("admin") => ActorRole::Admin,
    Some("customer") | None => ActorRole::Customer,
    Some(other) => return Err(AppError::Auth(format!("Unsupported role '{}'.", other))),
  };
  Ok(AuthContext { subject, role })
}

impl FromRequest for AuthContext {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = parse_headers(req);
    if let Err(e) = &result {
      warn!(error = %e, "AuthContext extractor rejected request.");
    }
    ready(result)
  }
}
