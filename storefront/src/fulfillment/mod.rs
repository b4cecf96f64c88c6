// storefront/src/fulfillment/mod.rs

//! The order fulfillment lifecycle: admission control, the delivery state
//! machine, and the service that orchestrates them.

pub mod capacity_ledger;
pub mod delivery_state;
pub mod service;
pub mod stock_guard;

pub use delivery_state::{Transition, TransitionError, TransitionTarget};
pub use service::{FulfillmentService, LineRequest, OrderRequest};
