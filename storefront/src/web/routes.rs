// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::web::handlers::{capacity_handlers, notification_handlers, order_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/schedule", web::post().to(order_handlers::schedule_delivery_handler))
          .route("/{order_id}/confirm", web::post().to(order_handlers::confirm_delivery_handler))
          .route("/{order_id}/accept", web::post().to(order_handlers::accept_delivery_handler))
          .route(
            "/{order_id}/request-reschedule",
            web::post().to(order_handlers::request_reschedule_handler),
          )
          .route(
            "/{order_id}/reschedule-decision",
            web::post().to(order_handlers::reschedule_decision_handler),
          )
          .route("/{order_id}/advance", web::post().to(order_handlers::advance_status_handler))
          .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler)),
      )
      .service(
        web::resource("/capacity")
          .route(web::get().to(capacity_handlers::get_capacity_handler))
          .route(web::put().to(capacity_handlers::update_capacity_handler)),
      )
      .service(
        web::scope("/notifications")
          .route("", web::get().to(notification_handlers::list_notifications_handler))
          .route(
            "/{notification_id}/read",
            web::post().to(notification_handlers::mark_notification_read_handler),
          ),
      ),
  );
}
