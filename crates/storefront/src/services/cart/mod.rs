//! Cart service.
//!
//! # Architecture
//!
//! - [`CartManager`] - the cart the shopper sees, one per session owner
//! - [`CartStore`] - where mutations are persisted: [`LocalCartStore`] for
//!   guests, [`RemoteCartStore`] for signed-in users
//! - [`GuestCartStorage`] - guest cart snapshot in the key-value store
//! - [`migrate_guest_cart`] - moves a guest cart to the backend on login
//! - [`Notifier`] - shopper-facing success and error messages

mod error;
mod guest;
mod manager;
mod migration;
mod notify;
mod state;
mod store;

pub use error::{COUPON_FALLBACK_MESSAGE, CartError};
pub use guest::{GuestCart, GuestCartError, GuestCartStorage};
pub use manager::{CartManager, Reconciliation, SessionSync};
pub use migration::{MigrationReport, migrate_guest_cart};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use state::{CartState, ServerPricing};
pub use store::{CartSnapshot, CartStore, LocalCartStore, RemoteCartStore};
