// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use storefront::auth::AuthContext;
use storefront::config::AppConfig;
use storefront::errors::{AppError, Result as AppResult};
use storefront::fulfillment::{LineRequest, OrderRequest};
use storefront::models::{CapacityWindow, Category, DeliveryStatus, Notification, Order, Product};
use storefront::services::{ManualClock, MockPaymentGateway, NotificationSink, PaymentGateway};
use storefront::state::AppState;
use storefront::store::MemoryStore;

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

/// Monday morning the test window opens.
pub fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

pub fn day(n: i64) -> DateTime<Utc> {
  t0() + Duration::days(n)
}

/// A sink that always fails, counting attempts.
#[derive(Debug, Default)]
pub struct FailingSink {
  pub attempts: AtomicUsize,
}

impl FailingSink {
  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl NotificationSink for FailingSink {
  async fn send(&self, _notification: &Notification) -> AppResult<()> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    Err(AppError::Internal("notification channel unavailable".to_string()))
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub clock: Arc<ManualClock>,
}

pub struct TestAppBuilder {
  window: CapacityWindow,
  products: Vec<Product>,
  sink: Option<Arc<dyn NotificationSink>>,
  payments: Arc<dyn PaymentGateway>,
  notify_in_background: bool,
}

impl TestAppBuilder {
  pub fn new() -> Self {
    Self {
      window: CapacityWindow::unlimited(t0()),
      products: Vec::new(),
      sink: None,
      payments: Arc::new(MockPaymentGateway::new("mock_test_acct", std::time::Duration::ZERO)),
      notify_in_background: false,
    }
  }

  pub fn window(mut self, window: CapacityWindow) -> Self {
    self.window = window;
    self
  }

  pub fn product(mut self, product: Product) -> Self {
    self.products.push(product);
    self
  }

  pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
    self.sink = Some(sink);
    self
  }

  pub fn payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
    self.payments = payments;
    self
  }

  /// Spawn notification delivery like the server does by default.
  pub fn notify_in_background(mut self) -> Self {
    self.notify_in_background = true;
    self
  }

  pub fn build(self) -> TestApp {
    setup_tracing();
    let store = Arc::new(MemoryStore::new(self.window).with_products(self.products));
    let clock = Arc::new(ManualClock::new(t0()));
    let sink: Arc<dyn NotificationSink> = match self.sink {
      Some(sink) => sink,
      None => store.clone(),
    };
    let config = AppConfig {
      notify_in_background: self.notify_in_background,
      ..AppConfig::for_tests()
    };
    let state = AppState::new(
      Arc::new(config),
      store.clone(),
      sink,
      self.payments,
      clock.clone(),
    );
    TestApp { state, store, clock }
  }
}

/// Lets tasks spawned onto the current-thread test runtime run to completion.
pub async fn settle() {
  for _ in 0..8 {
    tokio::task::yield_now().await;
  }
}

pub fn customer() -> AuthContext {
  AuthContext::customer(Uuid::new_v4())
}

pub fn admin() -> AuthContext {
  AuthContext::admin(Uuid::new_v4())
}

pub fn catalog_product(price_cents: i64, available: i32) -> Product {
  Product::new("Sourdough loaf", Category::Catalog, price_cents, available)
}

pub fn custom_product(price_cents: i64, available: i32) -> Product {
  Product::new("Celebration cake", Category::CustomOrder, price_cents, available)
}

pub fn order_request(category: Category, lines: &[(&Product, i32)]) -> OrderRequest {
  OrderRequest {
    customer_id: None,
    category,
    items: lines
      .iter()
      .map(|(product, quantity)| LineRequest {
        product_id: product.id,
        quantity: *quantity,
      })
      .collect(),
  }
}

impl TestApp {
  pub async fn place(&self, auth: AuthContext, product: &Product, quantity: i32) -> AppResult<Order> {
    self
      .state
      .fulfillment()
      .place_order(auth, order_request(product.category, &[(product, quantity)]))
      .await
  }

  /// Places an order for `buyer` and drives it to `status` through admin and
  /// customer transitions.
  pub async fn order_in(&self, buyer: AuthContext, product: &Product, status: DeliveryStatus) -> Order {
    let service = self.state.fulfillment();
    let staff = admin();
    let mut order = self.place(buyer, product, 1).await.expect("placing order");
    let path: &[DeliveryStatus] = match status {
      DeliveryStatus::Paid => &[],
      DeliveryStatus::Reviewing => &[DeliveryStatus::Reviewing],
      DeliveryStatus::Making => &[DeliveryStatus::Reviewing, DeliveryStatus::Making],
      DeliveryStatus::ReadyForDelivery => &[DeliveryStatus::ReadyForDelivery],
      DeliveryStatus::Confirmed => &[DeliveryStatus::ReadyForDelivery, DeliveryStatus::Confirmed],
      DeliveryStatus::Delivered => &[DeliveryStatus::ReadyForDelivery, DeliveryStatus::Delivered],
      DeliveryStatus::Cancelled => &[DeliveryStatus::Cancelled],
    };
    for step in path {
      order = match step {
        DeliveryStatus::ReadyForDelivery => service
          .schedule_delivery(staff, order.id, Some(day(5)))
          .await
          .expect("scheduling"),
        DeliveryStatus::Confirmed => service.confirm_delivery(buyer, order.id).await.expect("confirming"),
        other => service.advance(staff, order.id, *other).await.expect("advancing"),
      };
    }
    assert_eq!(order.delivery_status, status);
    order
  }

  pub async fn product(&self, product_id: Uuid) -> Product {
    use storefront::store::FulfillmentStore;
    self.store.load_product(product_id).await.unwrap().expect("product exists")
  }

  pub async fn window(&self) -> CapacityWindow {
    use storefront::store::FulfillmentStore;
    self.store.load_capacity().await.unwrap()
  }
}
