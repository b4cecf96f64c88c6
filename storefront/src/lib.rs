// storefront/src/lib.rs

//! Order fulfillment for a small made-to-order storefront.
//!
//! Orders are admitted against a weekly capacity window and per-product
//! stock, then moved through a delivery state machine by admins and
//! customers. Every committed change fires a best-effort notification.

pub mod auth;
pub mod config;
pub mod errors;
pub mod fulfillment;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
