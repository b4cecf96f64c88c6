// storefront/src/services/mod.rs

//! Collaborators around the fulfillment core: time, payments, notifications.

pub mod clock;
pub mod notification_dispatcher;
pub mod payment_mock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notification_dispatcher::{NotificationDispatcher, NotificationSink};
pub use payment_mock::{MockPaymentGateway, PaymentGateway};
