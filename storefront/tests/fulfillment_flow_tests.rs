// tests/fulfillment_flow_tests.rs
mod common;

use std::sync::Arc;

use chrono::Duration;
use common::*;
use serial_test::serial;
use storefront::errors::{AdmissionDenial, AppError};
use storefront::fulfillment::LineRequest;
use storefront::models::{
  ActorRole, Audience, CapacitySettings, CapacityWindow, Category, DeliveryStatus, NotificationKind, Priority,
  ReschedulingStatus,
};
use storefront::services::MockPaymentGateway;
use storefront::store::FulfillmentStore;
use uuid::Uuid;

fn catalog_limited_window(max: i32) -> CapacityWindow {
  let mut window = CapacityWindow::unlimited(t0());
  window.is_catalog_limit_active = true;
  window.catalog_max_per_week = max;
  window
}

#[tokio::test]
async fn second_order_in_a_full_category_is_refused() {
  let loaf = catalog_product(1000, 10);
  let app = TestAppBuilder::new()
    .window(catalog_limited_window(1))
    .product(loaf.clone())
    .build();

  let first = app.place(customer(), &loaf, 1).await.unwrap();
  assert_eq!(first.delivery_status, DeliveryStatus::Paid);
  assert_eq!(first.total_cents, 1000);
  assert_eq!(first.status_history.len(), 1);
  assert_eq!(first.status_history[0].changed_by, ActorRole::System);
  assert_eq!(app.window().await.catalog_current_week_sales, 1);
  assert_eq!(app.window().await.current_week_orders, 1);

  let second = app.place(customer(), &loaf, 1).await.unwrap_err();
  assert!(matches!(
    second.admission_denial(),
    Some(AdmissionDenial::OrderLimitReached) | Some(AdmissionDenial::StockInsufficient)
  ));
  assert_eq!(app.window().await.catalog_current_week_sales, 1);
  assert_eq!(app.product(loaf.id).await.available, 9);
}

#[tokio::test]
async fn full_week_reopens_after_rollover() {
  let loaf = catalog_product(1000, 50);
  let mut window = CapacityWindow::unlimited(t0());
  window.is_order_limit_active = true;
  window.weekly_max_orders = 2;
  let app = TestAppBuilder::new().window(window).product(loaf.clone()).build();

  app.place(customer(), &loaf, 1).await.unwrap();
  app.place(customer(), &loaf, 1).await.unwrap();
  let refused = app.place(customer(), &loaf, 1).await.unwrap_err();
  assert_eq!(refused.admission_denial(), Some(AdmissionDenial::OrderLimitReached));

  app.clock.advance(Duration::days(8));
  let order = app.place(customer(), &loaf, 1).await.unwrap();
  assert_eq!(order.created_at, day(8));

  let window = app.window().await;
  assert_eq!(window.week_start_date, day(8));
  assert_eq!(window.current_week_orders, 1);
}

#[tokio::test]
async fn narrower_weekly_limit_caps_a_limited_category() {
  let loaf = catalog_product(1000, 50);
  let mut window = catalog_limited_window(10);
  window.is_order_limit_active = true;
  window.weekly_max_orders = 2;
  let app = TestAppBuilder::new().window(window).product(loaf.clone()).build();

  app.place(customer(), &loaf, 1).await.unwrap();
  app.place(customer(), &loaf, 1).await.unwrap();
  for _ in 0..2 {
    let refused = app.place(customer(), &loaf, 1).await.unwrap_err();
    assert_eq!(refused.admission_denial(), Some(AdmissionDenial::OrderLimitReached));
  }

  let window = app.window().await;
  assert_eq!(window.current_week_orders, 2);
  assert_eq!(window.catalog_current_week_sales, 2);
  assert_eq!(app.product(loaf.id).await.available, 48);
}

#[tokio::test]
async fn stock_is_checked_and_decremented() {
  let tart = catalog_product(2400, 2);
  let app = TestAppBuilder::new().product(tart.clone()).build();

  let refused = app.place(customer(), &tart, 3).await.unwrap_err();
  assert_eq!(refused.admission_denial(), Some(AdmissionDenial::StockInsufficient));

  let order = app.place(customer(), &tart, 2).await.unwrap();
  assert_eq!(order.total_cents, 4800);
  assert_eq!(app.product(tart.id).await.available, 0);
}

#[tokio::test]
async fn inactive_store_refuses_orders() {
  let loaf = catalog_product(1000, 5);
  let mut window = CapacityWindow::unlimited(t0());
  window.is_store_active = false;
  let app = TestAppBuilder::new().window(window).product(loaf.clone()).build();

  let refused = app.place(customer(), &loaf, 1).await.unwrap_err();
  assert_eq!(refused.admission_denial(), Some(AdmissionDenial::StoreInactive));
  assert!(app.store.list_orders(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_order_leaves_no_partial_admission() {
  let loaf = catalog_product(1000, 10);
  let cake = custom_product(6500, 1);
  let app = TestAppBuilder::new().product(loaf.clone()).product(cake.clone()).build();

  let request = order_request(Category::Catalog, &[(&loaf, 2), (&cake, 2)]);
  let refused = app.state.fulfillment().place_order(customer(), request).await.unwrap_err();
  assert_eq!(refused.admission_denial(), Some(AdmissionDenial::StockInsufficient));

  assert_eq!(app.product(loaf.id).await.available, 10);
  assert_eq!(app.product(cake.id).await.available, 1);
  let window = app.window().await;
  assert_eq!(window.current_week_orders, 0);
  assert_eq!(window.catalog_current_week_sales, 0);
  assert!(app.store.list_orders(None, None).await.unwrap().is_empty());
  assert!(app.store.notifications().is_empty());
}

#[tokio::test]
async fn duplicate_lines_are_merged_before_the_stock_check() {
  let loaf = catalog_product(1000, 3);
  let app = TestAppBuilder::new().product(loaf.clone()).build();

  let request = order_request(Category::Catalog, &[(&loaf, 2), (&loaf, 2)]);
  let refused = app.state.fulfillment().place_order(customer(), request).await.unwrap_err();
  assert_eq!(refused.admission_denial(), Some(AdmissionDenial::StockInsufficient));

  let request = order_request(Category::Catalog, &[(&loaf, 1), (&loaf, 2)]);
  let order = app.state.fulfillment().place_order(customer(), request).await.unwrap();
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].quantity, 3);
  assert_eq!(order.total_cents, 3000);
}

#[tokio::test]
async fn invalid_requests_are_validation_errors() {
  let loaf = catalog_product(1000, 3);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let service = app.state.fulfillment();

  let empty = order_request(Category::Catalog, &[]);
  assert!(matches!(
    service.place_order(customer(), empty).await,
    Err(AppError::Validation { ref field, .. }) if field == "items"
  ));

  let zero = order_request(Category::Catalog, &[(&loaf, 0)]);
  assert!(matches!(
    service.place_order(customer(), zero).await,
    Err(AppError::Validation { ref field, .. }) if field == "quantity"
  ));

  let mut unknown = order_request(Category::Catalog, &[(&loaf, 1)]);
  unknown.items.push(LineRequest {
    product_id: Uuid::new_v4(),
    quantity: 1,
  });
  assert!(matches!(service.place_order(customer(), unknown).await, Err(AppError::NotFound(_))));

  let as_admin = order_request(Category::Catalog, &[(&loaf, 1)]);
  assert!(matches!(service.place_order(admin(), as_admin).await, Err(AppError::Forbidden(_))));

  let mut for_someone_else = order_request(Category::Catalog, &[(&loaf, 1)]);
  for_someone_else.customer_id = Some(Uuid::new_v4());
  assert!(matches!(
    service.place_order(customer(), for_someone_else).await,
    Err(AppError::Forbidden(_))
  ));
}

#[tokio::test]
async fn declined_payment_persists_nothing() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new()
    .product(loaf.clone())
    .payments(Arc::new(MockPaymentGateway::declining("mock_declining")))
    .build();

  let err = app.place(customer(), &loaf, 1).await.unwrap_err();
  assert!(matches!(err, AppError::Payment(_)));
  assert_eq!(app.product(loaf.id).await.available, 5);
  assert_eq!(app.window().await.current_week_orders, 0);
  assert!(app.store.list_orders(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn reschedule_round_trip() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let staff = admin();
  let service = app.state.fulfillment();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::ReadyForDelivery).await;
  let history_before = order.status_history.len();

  let requested = service
    .request_reschedule(buyer, order.id, "only weekends".to_string())
    .await
    .unwrap();
  assert_eq!(requested.rescheduling_status, ReschedulingStatus::Requested);
  assert_eq!(requested.rescheduling_reason.as_deref(), Some("only weekends"));

  let approved = service
    .decide_reschedule(staff, order.id, true, Some(day(13)))
    .await
    .unwrap();
  assert_eq!(approved.delivery_status, DeliveryStatus::ReadyForDelivery);
  assert_eq!(approved.delivery_date, Some(day(13)));
  assert_eq!(approved.rescheduling_status, ReschedulingStatus::Approved);
  assert!(!approved.delivery_confirmed);
  assert_eq!(approved.status_history.len(), history_before + 2);

  let stored = service.get_order(buyer, order.id).await.unwrap();
  assert_eq!(stored, approved);
}

#[tokio::test]
async fn approving_without_a_date_is_refused_and_changes_nothing() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let service = app.state.fulfillment();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::Confirmed).await;
  let requested = service
    .request_reschedule(buyer, order.id, "away that week".to_string())
    .await
    .unwrap();

  let err = service.decide_reschedule(admin(), order.id, true, None).await.unwrap_err();
  assert!(matches!(err, AppError::Validation { ref field, .. } if field == "newDate"));
  assert_eq!(service.get_order(buyer, order.id).await.unwrap(), requested);

  let rejected = service.decide_reschedule(admin(), order.id, false, None).await.unwrap();
  assert_eq!(rejected.rescheduling_status, ReschedulingStatus::Rejected);
  assert_eq!(rejected.delivery_status, DeliveryStatus::Confirmed);
  assert_eq!(rejected.delivery_date, requested.delivery_date);
}

#[tokio::test]
async fn invalid_transition_leaves_stored_order_unchanged() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let service = app.state.fulfillment();

  let order = app.place(buyer, &loaf, 1).await.unwrap();
  let err = service
    .advance(admin(), order.id, DeliveryStatus::Making)
    .await
    .unwrap_err();
  match err {
    AppError::InvalidTransition { from, to } => {
      assert_eq!(from, "PAID");
      assert_eq!(to, "MAKING");
    }
    other => panic!("expected InvalidTransition, got {:?}", other),
  }

  let err = service.confirm_delivery(buyer, order.id).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidTransition { .. }));

  assert_eq!(service.get_order(buyer, order.id).await.unwrap(), order);
}

#[tokio::test]
async fn history_grows_by_one_per_transition() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let staff = admin();
  let service = app.state.fulfillment();

  let order = app.place(buyer, &loaf, 1).await.unwrap();
  let steps = [
    service.advance(staff, order.id, DeliveryStatus::Reviewing).await.unwrap(),
    service.advance(staff, order.id, DeliveryStatus::Making).await.unwrap(),
    service.schedule_delivery(staff, order.id, Some(day(3))).await.unwrap(),
    service.confirm_delivery(buyer, order.id).await.unwrap(),
    service.advance(staff, order.id, DeliveryStatus::Delivered).await.unwrap(),
  ];

  let mut previous = order;
  for current in steps {
    assert_eq!(current.status_history.len(), previous.status_history.len() + 1);
    assert_eq!(
      &current.status_history[..previous.status_history.len()],
      &previous.status_history[..]
    );
    assert_eq!(current.version, previous.version + 1);
    previous = current;
  }
  assert_eq!(previous.delivery_status, DeliveryStatus::Delivered);
  assert!(previous.delivery_confirmed);
}

#[tokio::test]
async fn customer_can_accept_delivery_directly() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::ReadyForDelivery).await;
  let accepted = app.state.fulfillment().accept_delivery(buyer, order.id).await.unwrap();
  assert_eq!(accepted.delivery_status, DeliveryStatus::Delivered);

  let err = app.state.fulfillment().cancel(admin(), order.id, None).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn actors_are_checked_before_the_state_machine() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let service = app.state.fulfillment();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::ReadyForDelivery).await;

  let stranger = service.confirm_delivery(customer(), order.id).await.unwrap_err();
  assert!(matches!(stranger, AppError::Forbidden(_)));

  let staff_confirming = service.confirm_delivery(admin(), order.id).await.unwrap_err();
  assert!(matches!(staff_confirming, AppError::Forbidden(_)));

  let customer_cancelling = service.cancel(buyer, order.id, None).await.unwrap_err();
  assert!(matches!(customer_cancelling, AppError::Forbidden(_)));

  let peeking = service.get_order(customer(), order.id).await.unwrap_err();
  assert!(matches!(peeking, AppError::Forbidden(_)));

  let missing = service.confirm_delivery(buyer, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(missing, AppError::OrderNotFound { .. }));
}

#[tokio::test]
async fn stale_write_is_a_conflict() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let order = app.place(customer(), &loaf, 1).await.unwrap();

  app
    .state
    .fulfillment()
    .advance(admin(), order.id, DeliveryStatus::Reviewing)
    .await
    .unwrap();

  // `order` still carries the version read before the transition.
  let err = app.store.save_order(&order).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn notifications_follow_committed_changes() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let buyer = customer();
  let service = app.state.fulfillment();

  let order = app.place(buyer, &loaf, 1).await.unwrap();
  service.schedule_delivery(admin(), order.id, Some(day(4))).await.unwrap();
  service
    .request_reschedule(buyer, order.id, "mornings only".to_string())
    .await
    .unwrap();
  let _ = service.advance(admin(), order.id, DeliveryStatus::Making).await;

  let sent = app.store.notifications();
  let kinds: Vec<NotificationKind> = sent.iter().map(|n| n.kind).collect();
  assert_eq!(
    kinds,
    vec![
      NotificationKind::NewOrder,
      NotificationKind::DeliveryScheduled,
      NotificationKind::RescheduleRequested,
    ]
  );

  assert_eq!(sent[0].audience, Audience::Admin);
  assert_eq!(sent[0].priority, Priority::High);
  assert_eq!(sent[1].audience, Audience::Customer);
  assert_eq!(sent[1].priority, Priority::Normal);
  assert_eq!(sent[2].audience, Audience::Admin);
  assert_eq!(sent[2].priority, Priority::High);
  assert!(sent.iter().all(|n| !n.is_read));
  assert_eq!(sent[0].data["orderId"], serde_json::json!(order.id));
}

#[tokio::test]
async fn failing_sink_does_not_undo_a_confirmation() {
  let loaf = catalog_product(1000, 5);
  let sink = Arc::new(FailingSink::default());
  let app = TestAppBuilder::new().product(loaf.clone()).sink(sink.clone()).build();
  let buyer = customer();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::ReadyForDelivery).await;
  let confirmed = app.state.fulfillment().confirm_delivery(buyer, order.id).await.unwrap();
  assert_eq!(confirmed.delivery_status, DeliveryStatus::Confirmed);
  assert!(confirmed.delivery_confirmed);

  let stored = app.store.load_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.delivery_status, DeliveryStatus::Confirmed);
  assert!(stored.delivery_confirmed);
  // New order, schedule, confirm.
  assert_eq!(sink.attempts(), 3);
}

#[tokio::test]
async fn background_notifications_arrive_after_the_request_returns() {
  let loaf = catalog_product(1000, 5);
  let app = TestAppBuilder::new().product(loaf.clone()).notify_in_background().build();

  let order = app.place(customer(), &loaf, 1).await.unwrap();
  assert!(app.store.notifications().is_empty());

  settle().await;
  let sent = app.store.notifications();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].kind, NotificationKind::NewOrder);
  assert_eq!(sent[0].data["orderId"], serde_json::json!(order.id));
}

#[tokio::test]
async fn background_sink_failure_does_not_undo_a_confirmation() {
  let loaf = catalog_product(1000, 5);
  let sink = Arc::new(FailingSink::default());
  let app = TestAppBuilder::new()
    .product(loaf.clone())
    .sink(sink.clone())
    .notify_in_background()
    .build();
  let buyer = customer();

  let order = app.order_in(buyer, &loaf, DeliveryStatus::ReadyForDelivery).await;
  settle().await;
  let attempts_before = sink.attempts();
  assert_eq!(attempts_before, 2);

  let confirmed = app.state.fulfillment().confirm_delivery(buyer, order.id).await.unwrap();
  assert_eq!(confirmed.delivery_status, DeliveryStatus::Confirmed);
  assert!(confirmed.delivery_confirmed);
  assert_eq!(sink.attempts(), attempts_before);

  settle().await;
  assert_eq!(sink.attempts(), attempts_before + 1);
  let stored = app.store.load_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.delivery_status, DeliveryStatus::Confirmed);
  assert!(stored.delivery_confirmed);
}

#[tokio::test]
async fn capacity_settings_are_admin_only_and_validated() {
  let app = TestAppBuilder::new().build();
  let service = app.state.fulfillment();

  let settings = CapacitySettings {
    weekly_max_orders: Some(20),
    is_order_limit_active: Some(true),
    ..Default::default()
  };
  assert!(matches!(
    service.update_capacity(customer(), settings.clone()).await,
    Err(AppError::Forbidden(_))
  ));

  let window = service.update_capacity(admin(), settings).await.unwrap();
  assert_eq!(window.weekly_max_orders, 20);
  assert!(window.is_order_limit_active);
  assert!(!window.is_catalog_limit_active);

  let negative = CapacitySettings {
    catalog_max_per_week: Some(-1),
    ..Default::default()
  };
  assert!(matches!(
    service.update_capacity(admin(), negative).await,
    Err(AppError::Validation { ref field, .. }) if field == "catalogMaxPerWeek"
  ));
}

#[tokio::test]
async fn capacity_snapshot_rolls_an_expired_window() {
  let mut window = CapacityWindow::unlimited(t0());
  window.current_week_orders = 7;
  let app = TestAppBuilder::new().window(window).build();

  app.clock.set(day(10));
  let snapshot = app.state.fulfillment().capacity_snapshot(admin()).await.unwrap();
  assert_eq!(snapshot.current_week_orders, 0);
  assert_eq!(snapshot.week_start_date, day(10));
}

#[tokio::test]
async fn order_listing_filters_by_status_and_owner() {
  let loaf = catalog_product(1000, 10);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let alice = customer();
  let bob = customer();
  let service = app.state.fulfillment();

  let first = app.place(alice, &loaf, 1).await.unwrap();
  app.place(bob, &loaf, 1).await.unwrap();
  service.advance(admin(), first.id, DeliveryStatus::Reviewing).await.unwrap();

  assert_eq!(service.list_orders(admin(), None).await.unwrap().len(), 2);
  let reviewing = service
    .list_orders(admin(), Some(DeliveryStatus::Reviewing))
    .await
    .unwrap();
  assert_eq!(reviewing.len(), 1);
  assert_eq!(reviewing[0].id, first.id);

  let mine = service.list_orders(bob, None).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].customer_id, bob.subject);
}

#[tokio::test]
async fn notification_feed_can_be_marked_read() {
  let loaf = catalog_product(1000, 10);
  let app = TestAppBuilder::new().product(loaf.clone()).build();
  let service = app.state.fulfillment();

  app.place(customer(), &loaf, 1).await.unwrap();
  let unread = service.notifications(admin(), true).await.unwrap();
  assert_eq!(unread.len(), 1);

  let read = service.mark_notification_read(admin(), unread[0].id).await.unwrap();
  assert!(read.is_read);
  assert!(service.notifications(admin(), true).await.unwrap().is_empty());
  assert_eq!(service.notifications(admin(), false).await.unwrap().len(), 1);

  assert!(matches!(
    service.notifications(customer(), false).await,
    Err(AppError::Forbidden(_))
  ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_checkouts_never_exceed_the_weekly_limit() {
  let loaf = catalog_product(1000, 100);
  let mut window = CapacityWindow::unlimited(t0());
  window.is_order_limit_active = true;
  window.weekly_max_orders = 5;
  let app = TestAppBuilder::new().window(window).product(loaf.clone()).build();

  let mut handles = Vec::new();
  for _ in 0..20 {
    let state = app.state.clone();
    let request = order_request(Category::Catalog, &[(&loaf, 1)]);
    handles.push(tokio::spawn(async move {
      state.fulfillment().place_order(customer(), request).await
    }));
  }

  let mut admitted = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => admitted += 1,
      Err(e) => assert_eq!(e.admission_denial(), Some(AdmissionDenial::OrderLimitReached)),
    }
  }

  assert_eq!(admitted, 5);
  assert_eq!(app.window().await.current_week_orders, 5);
  assert_eq!(app.product(loaf.id).await.available, 95);
}
