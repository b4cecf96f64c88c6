// storefront/src/models/capacity.rs

//! The store-wide capacity window: weekly limits and their running counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Sales category an order is admitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Catalog,
  CustomOrder,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Catalog => "catalog",
      Category::CustomOrder => "custom_order",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "catalog" => Ok(Category::Catalog),
      "custom_order" | "custom" => Ok(Category::CustomOrder),
      other => Err(format!("unknown category '{}'", other)),
    }
  }
}

/// One of the three weekly counters kept by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
  WeeklyOrders,
  CatalogSales,
  CustomOrderSales,
}

impl Counter {
  pub fn for_category(category: Category) -> Self {
    match category {
      Category::Catalog => Counter::CatalogSales,
      Category::CustomOrder => Counter::CustomOrderSales,
    }
  }

  /// Column holding the running count.
  pub fn current_column(&self) -> &'static str {
    match self {
      Counter::WeeklyOrders => "current_week_orders",
      Counter::CatalogSales => "catalog_current_week_sales",
      Counter::CustomOrderSales => "custom_orders_current_week_sales",
    }
  }

  /// Column holding the ceiling.
  pub fn max_column(&self) -> &'static str {
    match self {
      Counter::WeeklyOrders => "weekly_max_orders",
      Counter::CatalogSales => "catalog_max_per_week",
      Counter::CustomOrderSales => "custom_orders_max_per_week",
    }
  }
}

/// Singleton capacity record of a store deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CapacityWindow {
  pub is_store_active: bool,
  pub week_start_date: DateTime<Utc>,

  pub weekly_max_orders: i32,
  pub current_week_orders: i32,
  pub is_order_limit_active: bool,

  pub catalog_max_per_week: i32,
  pub catalog_current_week_sales: i32,
  pub is_catalog_limit_active: bool,

  pub custom_orders_max_per_week: i32,
  pub custom_orders_current_week_sales: i32,
  pub is_custom_orders_limit_active: bool,

  pub version: i64,
}

impl CapacityWindow {
  /// An open store with every limit switched off.
  pub fn unlimited(now: DateTime<Utc>) -> Self {
    Self {
      is_store_active: true,
      week_start_date: now,
      weekly_max_orders: 0,
      current_week_orders: 0,
      is_order_limit_active: false,
      catalog_max_per_week: 0,
      catalog_current_week_sales: 0,
      is_catalog_limit_active: false,
      custom_orders_max_per_week: 0,
      custom_orders_current_week_sales: 0,
      is_custom_orders_limit_active: false,
      version: 0,
    }
  }

  pub fn current(&self, counter: Counter) -> i32 {
    match counter {
      Counter::WeeklyOrders => self.current_week_orders,
      Counter::CatalogSales => self.catalog_current_week_sales,
      Counter::CustomOrderSales => self.custom_orders_current_week_sales,
    }
  }

  pub fn current_mut(&mut self, counter: Counter) -> &mut i32 {
    match counter {
      Counter::WeeklyOrders => &mut self.current_week_orders,
      Counter::CatalogSales => &mut self.catalog_current_week_sales,
      Counter::CustomOrderSales => &mut self.custom_orders_current_week_sales,
    }
  }

  pub fn max(&self, counter: Counter) -> i32 {
    match counter {
      Counter::WeeklyOrders => self.weekly_max_orders,
      Counter::CatalogSales => self.catalog_max_per_week,
      Counter::CustomOrderSales => self.custom_orders_max_per_week,
    }
  }

  pub fn is_active(&self, counter: Counter) -> bool {
    match counter {
      Counter::WeeklyOrders => self.is_order_limit_active,
      Counter::CatalogSales => self.is_catalog_limit_active,
      Counter::CustomOrderSales => self.is_custom_orders_limit_active,
    }
  }

  pub fn reset_counters(&mut self, now: DateTime<Utc>) {
    self.current_week_orders = 0;
    self.catalog_current_week_sales = 0;
    self.custom_orders_current_week_sales = 0;
    self.week_start_date = now;
  }

  pub fn apply_settings(&mut self, settings: &CapacitySettings) {
    macro_rules! set_if_some {
      ($($field:ident),* $(,)?) => {
        $(if let Some(value) = settings.$field { self.$field = value; })*
      };
    }
    set_if_some!(
      is_store_active,
      weekly_max_orders,
      is_order_limit_active,
      catalog_max_per_week,
      is_catalog_limit_active,
      custom_orders_max_per_week,
      is_custom_orders_limit_active,
    );
  }
}

/// Admin-editable part of the window. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySettings {
  pub is_store_active: Option<bool>,
  pub weekly_max_orders: Option<i32>,
  pub is_order_limit_active: Option<bool>,
  pub catalog_max_per_week: Option<i32>,
  pub is_catalog_limit_active: Option<bool>,
  pub custom_orders_max_per_week: Option<i32>,
  pub is_custom_orders_limit_active: Option<bool>,
}

impl CapacitySettings {
  /// Name of the first negative ceiling, if any.
  pub fn invalid_field(&self) -> Option<&'static str> {
    [
      ("weeklyMaxOrders", self.weekly_max_orders),
      ("catalogMaxPerWeek", self.catalog_max_per_week),
      ("customOrdersMaxPerWeek", self.custom_orders_max_per_week),
    ]
    .into_iter()
    .find(|(_, value)| value.map_or(false, |v| v < 0))
    .map(|(name, _)| name)
  }
}
