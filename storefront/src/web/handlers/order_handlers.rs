// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::fulfillment::OrderRequest;
use crate::models::DeliveryStatus;
use crate::state::AppState;

fn parse_status(field: &str, raw: &str) -> Result<DeliveryStatus, AppError> {
  raw.parse::<DeliveryStatus>().map_err(|e| AppError::validation(field, e))
}

#[instrument(
  name = "handler::place_order",
  skip(app_state, auth, payload),
  fields(subject = %auth.subject, lines = payload.items.len())
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  payload: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.fulfillment().place_order(auth, payload.into_inner()).await?;
  info!(order_id = %order.id, "Order placed.");
  Ok(HttpResponse::Created().json(json!({
    "orderId": order.id,
    "deliveryStatus": order.delivery_status,
    "order": order,
  })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
  pub delivery_status: Option<String>,
}

#[instrument(name = "handler::list_orders", skip(app_state, auth, query), fields(subject = %auth.subject))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let status = query
    .delivery_status
    .as_deref()
    .map(|raw| parse_status("deliveryStatus", raw))
    .transpose()?;
  let orders = app_state.fulfillment().list_orders(auth, status).await?;
  Ok(HttpResponse::Ok().json(json!({ "count": orders.len(), "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth, path), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.fulfillment().get_order(auth, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePayload {
  pub delivery_date: Option<DateTime<Utc>>,
}

#[instrument(name = "handler::schedule_delivery", skip(app_state, auth, path, payload), fields(order_id = %path.as_ref()))]
pub async fn schedule_delivery_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
  payload: web::Json<SchedulePayload>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .fulfillment()
    .schedule_delivery(auth, path.into_inner(), payload.delivery_date)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::confirm_delivery", skip(app_state, auth, path), fields(order_id = %path.as_ref()))]
pub async fn confirm_delivery_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.fulfillment().confirm_delivery(auth, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::accept_delivery", skip(app_state, auth, path), fields(order_id = %path.as_ref()))]
pub async fn accept_delivery_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.fulfillment().accept_delivery(auth, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Deserialize)]
pub struct ReschedulePayload {
  #[serde(default)]
  pub reason: String,
}

#[instrument(name = "handler::request_reschedule", skip(app_state, auth, path, payload), fields(order_id = %path.as_ref()))]
pub async fn request_reschedule_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
  payload: web::Json<ReschedulePayload>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .fulfillment()
    .request_reschedule(auth, path.into_inner(), payload.into_inner().reason)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleDecisionPayload {
  pub approve: bool,
  pub new_date: Option<DateTime<Utc>>,
}

#[instrument(
  name = "handler::reschedule_decision",
  skip(app_state, auth, path, payload),
  fields(order_id = %path.as_ref(), approve = payload.approve)
)]
pub async fn reschedule_decision_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
  payload: web::Json<RescheduleDecisionPayload>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .fulfillment()
    .decide_reschedule(auth, path.into_inner(), payload.approve, payload.new_date)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancePayload {
  pub to_status: String,
}

#[instrument(
  name = "handler::advance_status",
  skip(app_state, auth, path, payload),
  fields(order_id = %path.as_ref(), to_status = %payload.to_status)
)]
pub async fn advance_status_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
  payload: web::Json<AdvancePayload>,
) -> Result<HttpResponse, AppError> {
  let to_status = parse_status("toStatus", &payload.to_status)?;
  let order = app_state.fulfillment().advance(auth, path.into_inner(), to_status).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelPayload {
  pub reason: Option<String>,
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth, path, payload), fields(order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  path: web::Path<Uuid>,
  payload: Option<web::Json<CancelPayload>>,
) -> Result<HttpResponse, AppError> {
  let reason = payload.and_then(|p| p.into_inner().reason);
  let order = app_state.fulfillment().cancel(auth, path.into_inner(), reason).await?;
  Ok(HttpResponse::Ok().json(order))
}
