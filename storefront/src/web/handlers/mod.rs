// storefront/src/web/handlers/mod.rs

pub mod capacity_handlers;
pub mod notification_handlers;
pub mod order_handlers;
