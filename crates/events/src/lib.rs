//! Subscription event bus and notification infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SubscriptionEvent`]: a notice about one project's subscription.
//! - [`NotificationLogger`]: background consumer that writes notices to the
//!   `notifications` table, deduplicating within a window.
//! - [`delivery`]: optional outbound webhook channel.

pub mod bus;
pub mod delivery;
pub mod logger;

pub use bus::{EventBus, SubscriptionEvent};
pub use delivery::webhook::WebhookDelivery;
pub use logger::{LogError, LogOutcome, NotificationLogger};
