// storefront/src/models/mod.rs

//! Persisted data structures of the fulfillment subsystem.

pub mod capacity;
pub mod notification;
pub mod order;
pub mod product;

pub use capacity::{CapacitySettings, CapacityWindow, Category, Counter};
pub use notification::{Audience, Notification, NotificationKind, Priority};
pub use order::{ActorRole, DeliveryStatus, Order, OrderItem, ReschedulingStatus, StatusEntry};
pub use product::Product;
