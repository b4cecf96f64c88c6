// storefront/src/web/handlers/capacity_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::CapacitySettings;
use crate::state::AppState;

#[instrument(name = "handler::get_capacity", skip(app_state, auth), fields(subject = %auth.subject))]
pub async fn get_capacity_handler(app_state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
  let window = app_state.fulfillment().capacity_snapshot(auth).await?;
  Ok(HttpResponse::Ok().json(window))
}

#[instrument(name = "handler::update_capacity", skip(app_state, auth, payload), fields(subject = %auth.subject))]
pub async fn update_capacity_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
  payload: web::Json<CapacitySettings>,
) -> Result<HttpResponse, AppError> {
  let window = app_state
    .fulfillment()
    .update_capacity(auth, payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(window))
}
