// storefront/src/web/handlers/notification_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
  #[serde(default)]
  pub unread: bool,
}

#[instrument(name = "handler::list_notifications", skip(app_state, auth), fields(subject = %auth.subject))]
pub async fn list_notifications_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  query: web::Query<NotificationsQuery>,
) -> Result<HttpResponse, AppError> {
  let notifications = app_state.fulfillment().notifications(auth, query.unread).await?;
  let unread = notifications.iter().filter(|n| !n.is_read).count();
  Ok(HttpResponse::Ok().json(json!({
    "unreadCount": unread,
    "notifications": notifications,
  })))
}

#[instrument(name = "handler::mark_notification_read", skip(app_state, auth, path), fields(notification_id = %path.as_ref()))]
pub async fn mark_notification_read_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let notification = app_state
    .fulfillment()
    .mark_notification_read(auth, path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(notification))
}
