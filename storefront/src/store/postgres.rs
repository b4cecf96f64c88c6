// storefront/src/store/postgres.rs

//! PostgreSQL-backed store. Orders live as documents (JSONB items and
//! history) so a transition is a single-row, single-statement write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{AdmissionPlan, AdmitOutcome, FulfillmentStore};
use crate::errors::{AdmissionDenial, AppError, Result as AppResult};
use crate::models::{
  CapacitySettings, CapacityWindow, DeliveryStatus, Notification, Order, OrderItem, Product, StatusEntry,
};
use crate::services::NotificationSink;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> AppResult<Self> {
    let pool = PgPool::connect(database_url).await?;
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> AppResult<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| AppError::Persistence(format!("Migration failed: {}", e)))
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

/// Decodes a TEXT tag column through the enum's serde representation.
fn parse_tag<T: DeserializeOwned>(column: &str, raw: String) -> AppResult<T> {
  serde_json::from_value(serde_json::Value::String(raw.clone()))
    .map_err(|e| AppError::Persistence(format!("Unexpected value '{}' in column {}: {}", raw, column, e)))
}

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  customer_id: Uuid,
  category: String,
  items: Json<Vec<OrderItem>>,
  total_cents: i64,
  delivery_status: String,
  delivery_date: Option<DateTime<Utc>>,
  delivery_confirmed: bool,
  rescheduling_status: String,
  rescheduling_reason: Option<String>,
  status_history: Json<Vec<StatusEntry>>,
  version: i64,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> AppResult<Self> {
    Ok(Order {
      id: row.id,
      customer_id: row.customer_id,
      category: parse_tag("orders.category", row.category)?,
      items: row.items.0,
      total_cents: row.total_cents,
      delivery_status: parse_tag("orders.delivery_status", row.delivery_status)?,
      delivery_date: row.delivery_date,
      delivery_confirmed: row.delivery_confirmed,
      rescheduling_status: parse_tag("orders.rescheduling_status", row.rescheduling_status)?,
      rescheduling_reason: row.rescheduling_reason,
      status_history: row.status_history.0,
      version: row.version,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct ProductRow {
  id: Uuid,
  name: String,
  category: String,
  price_cents: i64,
  available: i32,
  max_stock: i32,
  is_stock_limit_active: bool,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
  type Error = AppError;

  fn try_from(row: ProductRow) -> AppResult<Self> {
    Ok(Product {
      id: row.id,
      name: row.name,
      category: parse_tag("products.category", row.category)?,
      price_cents: row.price_cents,
      available: row.available,
      max_stock: row.max_stock,
      is_stock_limit_active: row.is_stock_limit_active,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
  id: Uuid,
  title: String,
  message: String,
  kind: String,
  priority: String,
  audience: String,
  is_read: bool,
  data: Json<serde_json::Value>,
  icon: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
  type Error = AppError;

  fn try_from(row: NotificationRow) -> AppResult<Self> {
    Ok(Notification {
      id: row.id,
      title: row.title,
      message: row.message,
      kind: parse_tag("notifications.kind", row.kind)?,
      priority: parse_tag("notifications.priority", row.priority)?,
      audience: parse_tag("notifications.audience", row.audience)?,
      is_read: row.is_read,
      data: row.data.0,
      icon: row.icon,
      created_at: row.created_at,
    })
  }
}

const CAPACITY_COLUMNS: &str = "version, is_store_active, week_start_date, \
  weekly_max_orders, current_week_orders, is_order_limit_active, \
  catalog_max_per_week, catalog_current_week_sales, is_catalog_limit_active, \
  custom_orders_max_per_week, custom_orders_current_week_sales, is_custom_orders_limit_active";

#[async_trait]
impl NotificationSink for PgStore {
  #[instrument(name = "pg_store::insert_notification", skip_all, fields(notification_id = %notification.id), err(Display))]
  async fn send(&self, notification: &Notification) -> AppResult<()> {
    sqlx::query(
      "INSERT INTO notifications (id, title, message, kind, priority, audience, is_read, data, icon, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(notification.id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.kind.as_str())
    .bind(notification.priority.as_str())
    .bind(notification.audience.as_str())
    .bind(notification.is_read)
    .bind(Json(&notification.data))
    .bind(&notification.icon)
    .bind(notification.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl FulfillmentStore for PgStore {
  async fn load_capacity(&self) -> AppResult<CapacityWindow> {
    let window = sqlx::query_as::<_, CapacityWindow>(&format!(
      "SELECT {} FROM capacity_window WHERE id = 1",
      CAPACITY_COLUMNS
    ))
    .fetch_one(&self.pool)
    .await?;
    Ok(window)
  }

  #[instrument(name = "pg_store::roll_capacity_window", skip(self), err(Display))]
  async fn roll_capacity_window(&self, observed_start: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<bool> {
    let result = sqlx::query(
      "UPDATE capacity_window SET current_week_orders = 0, catalog_current_week_sales = 0, \
       custom_orders_current_week_sales = 0, week_start_date = $1, version = version + 1 \
       WHERE id = 1 AND week_start_date = $2",
    )
    .bind(now)
    .bind(observed_start)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn update_capacity_settings(&self, settings: &CapacitySettings) -> AppResult<CapacityWindow> {
    let window = sqlx::query_as::<_, CapacityWindow>(&format!(
      "UPDATE capacity_window SET \
         is_store_active = COALESCE($1, is_store_active), \
         weekly_max_orders = COALESCE($2, weekly_max_orders), \
         is_order_limit_active = COALESCE($3, is_order_limit_active), \
         catalog_max_per_week = COALESCE($4, catalog_max_per_week), \
         is_catalog_limit_active = COALESCE($5, is_catalog_limit_active), \
         custom_orders_max_per_week = COALESCE($6, custom_orders_max_per_week), \
         is_custom_orders_limit_active = COALESCE($7, is_custom_orders_limit_active), \
         version = version + 1 \
       WHERE id = 1 RETURNING {}",
      CAPACITY_COLUMNS
    ))
    .bind(settings.is_store_active)
    .bind(settings.weekly_max_orders)
    .bind(settings.is_order_limit_active)
    .bind(settings.catalog_max_per_week)
    .bind(settings.is_catalog_limit_active)
    .bind(settings.custom_orders_max_per_week)
    .bind(settings.is_custom_orders_limit_active)
    .fetch_one(&self.pool)
    .await?;
    Ok(window)
  }

  async fn load_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?
      .map(Product::try_from)
      .transpose()
  }

  async fn upsert_product(&self, product: &Product) -> AppResult<()> {
    sqlx::query(
      "INSERT INTO products (id, name, category, price_cents, available, max_stock, is_stock_limit_active, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
       ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category, \
         price_cents = EXCLUDED.price_cents, available = EXCLUDED.available, max_stock = EXCLUDED.max_stock, \
         is_stock_limit_active = EXCLUDED.is_stock_limit_active, updated_at = EXCLUDED.updated_at",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.category.as_str())
    .bind(product.price_cents)
    .bind(product.available)
    .bind(product.max_stock)
    .bind(product.is_stock_limit_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "pg_store::insert_admitted_order", skip_all, fields(order_id = %order.id), err(Display))]
  async fn insert_admitted_order(&self, order: &Order, plan: &AdmissionPlan) -> AppResult<AdmitOutcome> {
    let mut tx = self.pool.begin().await?;

    // Conditional increment: the live counters are compared with the live
    // ceilings in the same statement that bumps them.
    let mut assignments: Vec<String> = plan
      .increments
      .iter()
      .map(|c| format!("{col} = {col} + 1", col = c.current_column()))
      .collect();
    assignments.push("version = version + 1".to_string());
    let gates: String = plan
      .gates
      .iter()
      .map(|c| format!(" AND {} < {}", c.current_column(), c.max_column()))
      .collect();
    let counters_sql = format!(
      "UPDATE capacity_window SET {} WHERE id = 1 AND is_store_active{}",
      assignments.join(", "),
      gates
    );

    let bumped = sqlx::query(&counters_sql).execute(&mut *tx).await?.rows_affected();
    if bumped == 0 {
      let store_active: bool = sqlx::query_scalar("SELECT is_store_active FROM capacity_window WHERE id = 1")
        .fetch_one(&mut *tx)
        .await?;
      tx.rollback().await?;
      let reason = if store_active {
        AdmissionDenial::OrderLimitReached
      } else {
        AdmissionDenial::StoreInactive
      };
      debug!(%reason, "Capacity gate refused the order at write time.");
      return Ok(AdmitOutcome::Denied(reason));
    }

    for item in &order.items {
      let taken = sqlx::query(
        "UPDATE products SET available = available - $1, updated_at = $3 WHERE id = $2 AND available >= $1",
      )
      .bind(item.quantity)
      .bind(item.product_id)
      .bind(order.created_at)
      .execute(&mut *tx)
      .await?
      .rows_affected();
      if taken == 0 {
        tx.rollback().await?;
        warn!(product_id = %item.product_id, quantity = item.quantity, "Stock ran out between check and write.");
        return Ok(AdmitOutcome::Denied(AdmissionDenial::StockInsufficient));
      }
    }

    sqlx::query(
      "INSERT INTO orders (id, customer_id, category, items, total_cents, delivery_status, delivery_date, \
         delivery_confirmed, rescheduling_status, rescheduling_reason, status_history, version, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(order.id)
    .bind(order.customer_id)
    .bind(order.category.as_str())
    .bind(Json(&order.items))
    .bind(order.total_cents)
    .bind(order.delivery_status.as_str())
    .bind(order.delivery_date)
    .bind(order.delivery_confirmed)
    .bind(order.rescheduling_status.as_str())
    .bind(order.rescheduling_reason.as_deref())
    .bind(Json(&order.status_history))
    .bind(order.version)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(AdmitOutcome::Admitted)
  }

  async fn load_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?
      .map(Order::try_from)
      .transpose()
  }

  #[instrument(name = "pg_store::save_order", skip_all, fields(order_id = %order.id, version = order.version), err(Display))]
  async fn save_order(&self, order: &Order) -> AppResult<Order> {
    let new_version: Option<i64> = sqlx::query_scalar(
      "UPDATE orders SET delivery_status = $3, delivery_date = $4, delivery_confirmed = $5, \
         rescheduling_status = $6, rescheduling_reason = $7, status_history = $8, updated_at = $9, \
         version = version + 1 \
       WHERE id = $1 AND version = $2 RETURNING version",
    )
    .bind(order.id)
    .bind(order.version)
    .bind(order.delivery_status.as_str())
    .bind(order.delivery_date)
    .bind(order.delivery_confirmed)
    .bind(order.rescheduling_status.as_str())
    .bind(order.rescheduling_reason.as_deref())
    .bind(Json(&order.status_history))
    .bind(order.updated_at)
    .fetch_optional(&self.pool)
    .await?;

    match new_version {
      Some(version) => Ok(Order {
        version,
        ..order.clone()
      }),
      None => {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
          .bind(order.id)
          .fetch_one(&self.pool)
          .await?;
        if exists {
          Err(AppError::Conflict(format!(
            "Order {} was modified concurrently (expected version {})",
            order.id, order.version
          )))
        } else {
          Err(AppError::OrderNotFound { order_id: order.id })
        }
      }
    }
  }

  async fn list_orders(&self, status: Option<DeliveryStatus>, customer_id: Option<Uuid>) -> AppResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
      "SELECT * FROM orders \
       WHERE ($1::text IS NULL OR delivery_status = $1) AND ($2::uuid IS NULL OR customer_id = $2) \
       ORDER BY created_at DESC, id",
    )
    .bind(status.map(|s| s.as_str()))
    .bind(customer_id)
    .fetch_all(&self.pool)
    .await?;
    rows.into_iter().map(Order::try_from).collect()
  }

  async fn list_notifications(&self, unread_only: bool) -> AppResult<Vec<Notification>> {
    let rows = sqlx::query_as::<_, NotificationRow>(
      "SELECT * FROM notifications WHERE (NOT $1 OR NOT is_read) ORDER BY created_at DESC",
    )
    .bind(unread_only)
    .fetch_all(&self.pool)
    .await?;
    rows.into_iter().map(Notification::try_from).collect()
  }

  async fn mark_notification_read(&self, notification_id: Uuid) -> AppResult<Notification> {
    sqlx::query_as::<_, NotificationRow>("UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING *")
      .bind(notification_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", notification_id)))
      .and_then(Notification::try_from)
  }
}
