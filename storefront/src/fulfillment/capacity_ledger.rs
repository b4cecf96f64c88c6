// storefront/src/fulfillment/capacity_ledger.rs

//! Weekly admission control over the store's `CapacityWindow`.
//!
//! The window is rolled lazily: nothing resets it on a schedule, the first
//! read after seven days does. Every read goes through
//! [`load_current_window`] so an expired count is never consulted.
//!
//! A category is gated by its own limit when that is active and by the
//! general weekly limit when that is active. With both on, the fuller of the
//! two refuses first.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::errors::{AdmissionDenial, Result as AppResult};
use crate::models::{CapacityWindow, Category, Counter};
use crate::store::{AdmissionPlan, FulfillmentStore};

pub const WINDOW_LENGTH_DAYS: i64 = 7;

pub fn window_length() -> Duration {
  Duration::days(WINDOW_LENGTH_DAYS)
}

pub fn is_expired(window: &CapacityWindow, now: DateTime<Utc>) -> bool {
  now - window.week_start_date >= window_length()
}

/// Resets the counters and restarts the window at `now` if seven days have
/// passed. Returns whether a reset happened.
pub fn check_rollover(window: &mut CapacityWindow, now: DateTime<Utc>) -> bool {
  if !is_expired(window, now) {
    return false;
  }
  window.reset_counters(now);
  true
}

/// Every active counter whose ceiling applies to `category`. Empty when the
/// category is unlimited.
pub fn governing_counters(window: &CapacityWindow, category: Category) -> Vec<Counter> {
  [Counter::for_category(category), Counter::WeeklyOrders]
    .into_iter()
    .filter(|counter| window.is_active(*counter))
    .collect()
}

fn is_full(window: &CapacityWindow, counter: Counter) -> bool {
  window.current(counter) >= window.max(counter)
}

pub fn check_admission(window: &CapacityWindow, category: Category) -> Result<(), AdmissionDenial> {
  if !window.is_store_active {
    return Err(AdmissionDenial::StoreInactive);
  }
  if governing_counters(window, category).into_iter().any(|c| is_full(window, c)) {
    return Err(AdmissionDenial::OrderLimitReached);
  }
  Ok(())
}

pub fn can_admit(window: &CapacityWindow, category: Category) -> bool {
  check_admission(window, category).is_ok()
}

/// Builds the counter plan for admitting one order touching `categories`.
///
/// Every category must pass [`check_admission`]. The plan gates once on each
/// active counter covering any of the categories, and increments the weekly
/// order count plus one counter per distinct category.
pub fn plan_admission(window: &CapacityWindow, categories: &[Category]) -> Result<AdmissionPlan, AdmissionDenial> {
  if !window.is_store_active {
    return Err(AdmissionDenial::StoreInactive);
  }
  let mut gates = Vec::new();
  let mut increments = vec![Counter::WeeklyOrders];

  for &category in categories {
    check_admission(window, category)?;
    for counter in governing_counters(window, category) {
      if !gates.contains(&counter) {
        gates.push(counter);
      }
    }
    let category_counter = Counter::for_category(category);
    if !increments.contains(&category_counter) {
      increments.push(category_counter);
    }
  }

  Ok(AdmissionPlan { gates, increments })
}

/// Applies a plan's increments to an in-hand window.
pub fn record_admission(window: &mut CapacityWindow, plan: &AdmissionPlan) {
  for counter in &plan.increments {
    *window.current_mut(*counter) += 1;
  }
}

/// Loads the window, rolling it over first if it has expired.
///
/// The reset is conditional on the start date this call observed, so of
/// several requests racing past the boundary exactly one performs it.
#[instrument(name = "capacity_ledger::load_current_window", skip(store), err(Display))]
pub async fn load_current_window(store: &dyn FulfillmentStore, now: DateTime<Utc>) -> AppResult<CapacityWindow> {
  let window = store.load_capacity().await?;
  if !is_expired(&window, now) {
    return Ok(window);
  }

  let observed_start = window.week_start_date;
  if store.roll_capacity_window(observed_start, now).await? {
    info!(
      previous_start = %observed_start,
      orders_last_window = window.current_week_orders,
      "Capacity window rolled over."
    );
  } else {
    debug!("Capacity window was rolled over by a concurrent request.");
  }
  store.load_capacity().await
}
