//! Cart state container.
//!
//! [`CartManager`] owns the cart the shopper sees. Item mutations are applied
//! locally first and then persisted to the active [`CartStore`]; coupon calls
//! go to the server first and only then change local state. Each mutation
//! reports how local and persisted state ended up relating to each other as a
//! [`Reconciliation`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use saverush_core::{
    AddressId, AppliedCoupon, CartItem, CouponId, PaymentMethodId, ProductId, Quantity,
};

use super::error::{COUPON_FALLBACK_MESSAGE, CartError};
use super::guest::GuestCartStorage;
use super::migration::{MigrationReport, migrate_guest_cart};
use super::notify::{Notification, Notifier};
use super::state::{CartState, ServerPricing};
use super::store::{CartStore, LocalCartStore, RemoteCartStore};
use crate::backend::{BackendError, CartApi, CheckoutRequest, CouponPricing, PlacedOrder};
use crate::error::add_breadcrumb;
use crate::models::{BearerToken, GuestToken, Session, SessionKey};
use crate::storage::KeyValueStore;

/// How a mutation settled.
#[must_use]
#[derive(Debug)]
pub enum Reconciliation {
    /// Local state and the store agree.
    Confirmed,
    /// The store call failed; the optimistic local change was kept.
    Drifted(CartError),
    /// The store call failed; local state was reloaded from the store.
    Resynced(CartError),
    /// Nothing changed, locally or remotely.
    Rejected(CartError),
}

impl Reconciliation {
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// The error behind a non-confirmed outcome.
    #[must_use]
    pub const fn error(&self) -> Option<&CartError> {
        match self {
            Self::Confirmed => None,
            Self::Drifted(e) | Self::Resynced(e) | Self::Rejected(e) => Some(e),
        }
    }
}

/// Result of [`CartManager::sync_session`].
#[derive(Debug)]
pub enum SessionSync {
    /// The session identity did not change; nothing was reloaded.
    Unchanged,
    /// The cart was reloaded for a new identity.
    Reloaded {
        /// Set when the change was a guest signing in.
        migration: Option<MigrationReport>,
    },
}

/// The shopper's cart, kept in sync with the active session's store.
pub struct CartManager {
    api: Arc<dyn CartApi>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    state: CartState,
    session: Option<Session>,
    last_key: Option<SessionKey>,
    was_guest: bool,
    initialized: bool,
    last_guest_token: Option<GuestToken>,
}

impl CartManager {
    /// Create an empty manager with no session attached.
    #[must_use]
    pub fn new(
        api: Arc<dyn CartApi>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            storage,
            notifier,
            state: CartState::default(),
            session: None,
            last_key: None,
            was_guest: false,
            initialized: false,
            last_guest_token: None,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.state.items()
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.state.total_items()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.state.subtotal()
    }

    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.state.total_price()
    }

    #[must_use]
    pub fn discounted_price(&self) -> Option<Decimal> {
        self.state.discounted_price()
    }

    #[must_use]
    pub fn original_price(&self) -> Option<Decimal> {
        self.state.original_price()
    }

    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.state.applied_coupon()
    }

    // =========================================================================
    // Session tracking
    // =========================================================================

    /// Attach `session`, reloading the cart if the identity changed.
    ///
    /// When a guest signs in after the manager has loaded at least once, the
    /// guest cart is migrated into the user's backend cart before the reload.
    ///
    /// The identity only counts as loaded once its cart has loaded, so after
    /// a failed load the next call with the same session tries again. The
    /// migration itself never repeats.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart for the new identity cannot be loaded.
    #[instrument(skip_all, fields(kind = ?session.kind()))]
    pub async fn sync_session(&mut self, session: Session) -> Result<SessionSync, CartError> {
        let key = session.key();
        if self.last_key.as_ref() == Some(&key) {
            self.session = Some(session);
            return Ok(SessionSync::Unchanged);
        }

        let migration = if self.initialized && self.was_guest {
            self.migrate_from_guest(&session).await
        } else {
            None
        };

        self.was_guest = session.is_guest();
        self.last_guest_token = session.guest_token().cloned();
        self.last_key = None;
        self.session = Some(session);
        self.initialized = true;
        self.state = CartState::default();

        self.refresh().await?;
        self.last_key = Some(key);
        Ok(SessionSync::Reloaded { migration })
    }

    async fn migrate_from_guest(&self, session: &Session) -> Option<MigrationReport> {
        let user = session.user()?;
        let token = self.last_guest_token.as_ref()?;

        let guest = GuestCartStorage::new(Arc::clone(&self.storage), token);
        let target = RemoteCartStore::new(Arc::clone(&self.api), user.token.clone());

        add_breadcrumb("cart", "Migrating guest cart", None);
        match migrate_guest_cart(&guest, &target).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "guest cart migration aborted");
                None
            }
        }
    }

    /// Reload the cart from the active store.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is attached or the load fails.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<(), CartError> {
        let store = self.store()?;
        self.state = store.load().await?.into();
        debug!(store = ?store.kind(), lines = self.state.items().len(), "cart loaded");
        Ok(())
    }

    fn store(&self) -> Result<Box<dyn CartStore>, CartError> {
        match &self.session {
            Some(Session::Authenticated(user)) => Ok(Box::new(RemoteCartStore::new(
                Arc::clone(&self.api),
                user.token.clone(),
            ))),
            Some(Session::Guest(guest)) => Ok(Box::new(LocalCartStore::new(
                GuestCartStorage::new(Arc::clone(&self.storage), &guest.token),
            ))),
            None => Err(CartError::NoSession),
        }
    }

    fn bearer(&self) -> Result<BearerToken, CartError> {
        match &self.session {
            Some(Session::Authenticated(user)) => Ok(user.token.clone()),
            Some(Session::Guest(_)) => Err(CartError::AuthenticationRequired),
            None => Err(CartError::NoSession),
        }
    }

    // =========================================================================
    // Item mutations
    // =========================================================================

    /// Add one unit of `item`.
    #[instrument(skip(self, item), fields(product_id = %item.id))]
    pub async fn add_to_cart(&mut self, item: CartItem) -> Reconciliation {
        let store = match self.store() {
            Ok(store) => store,
            Err(e) => return self.reject(e),
        };

        self.state.add(item.clone());
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", item.id.as_str())]));

        match store.add(&item, 1).await {
            Ok(()) => {
                self.notify(Notification::success(format!("{} added to cart", item.name)));
                Reconciliation::Confirmed
            }
            Err(e) => {
                warn!(error = %e, "add to cart not persisted");
                self.notify(Notification::error(e.user_message()));
                Reconciliation::Drifted(e)
            }
        }
    }

    /// Set the quantity of a line. Below one removes it; above 99 clamps.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_quantity(&mut self, id: &ProductId, quantity: u32) -> Reconciliation {
        if quantity < Quantity::MIN.get() {
            return self.remove_from_cart(id).await;
        }

        let store = match self.store() {
            Ok(store) => store,
            Err(e) => return self.reject(e),
        };

        let quantity = Quantity::clamped(quantity);
        if !self.state.set_quantity(id, quantity) {
            return self.reject(CartError::ItemNotFound(id.clone()));
        }

        match store.update(id, quantity.get()).await {
            Ok(()) => {
                self.notify(Notification::success("Cart updated"));
                Reconciliation::Confirmed
            }
            Err(e) => {
                warn!(error = %e, "quantity update not persisted");
                self.notify(Notification::error(e.user_message()));
                Reconciliation::Drifted(e)
            }
        }
    }

    /// Remove a line.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_from_cart(&mut self, id: &ProductId) -> Reconciliation {
        let store = match self.store() {
            Ok(store) => store,
            Err(e) => return self.reject(e),
        };

        let Some(removed) = self.state.remove(id) else {
            return self.reject(CartError::ItemNotFound(id.clone()));
        };
        add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));

        match store.remove(id).await {
            Ok(()) => {
                self.notify(Notification::success(format!(
                    "{} removed from cart",
                    removed.name
                )));
                Reconciliation::Confirmed
            }
            Err(e) => {
                self.notify(Notification::error(e.user_message()));
                self.resync(store.as_ref()).await;
                Reconciliation::Resynced(e)
            }
        }
    }

    /// Remove every line. Coupon state is left to the server.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Reconciliation {
        let store = match self.store() {
            Ok(store) => store,
            Err(e) => return self.reject(e),
        };

        self.state.clear_items();
        add_breadcrumb("cart", "Cleared cart", None);

        match store.clear().await {
            Ok(()) => {
                self.notify(Notification::success("Cart cleared"));
                Reconciliation::Confirmed
            }
            Err(e) => {
                self.notify(Notification::error(e.user_message()));
                self.resync(store.as_ref()).await;
                Reconciliation::Resynced(e)
            }
        }
    }

    async fn resync(&mut self, store: &dyn CartStore) {
        match store.load().await {
            Ok(snapshot) => {
                self.state = snapshot.into();
                info!(
                    store = ?store.kind(),
                    lines = self.state.items().len(),
                    "cart resynced from store"
                );
            }
            Err(e) => warn!(store = ?store.kind(), error = %e, "cart resync failed"),
        }
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Apply a coupon. Signed-in users only.
    #[instrument(skip(self), fields(coupon_id = %coupon_id))]
    pub async fn apply_coupon(&mut self, coupon_id: &CouponId) -> Reconciliation {
        let token = match self.bearer() {
            Ok(token) => token,
            Err(e) => return self.reject(e),
        };

        let result = self.api.apply_coupon(&token, coupon_id).await;
        self.settle_coupon(result, "Coupon applied")
    }

    /// Remove the applied coupon. Signed-in users only.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&mut self) -> Reconciliation {
        let token = match self.bearer() {
            Ok(token) => token,
            Err(e) => return self.reject(e),
        };

        let result = self.api.remove_coupon(&token).await;
        self.settle_coupon(result, "Coupon removed")
    }

    fn settle_coupon(
        &mut self,
        result: Result<CouponPricing, BackendError>,
        success_message: &str,
    ) -> Reconciliation {
        match result {
            Ok(pricing) => {
                self.state.apply_pricing(
                    ServerPricing {
                        current_price: pricing.current_price,
                        original_price: pricing.original_price,
                    },
                    pricing.applied_coupon,
                );
                self.notify(Notification::success(success_message));
                Reconciliation::Confirmed
            }
            Err(e) => {
                let message = e.server_message().unwrap_or(COUPON_FALLBACK_MESSAGE);
                self.notify(Notification::error(message));
                Reconciliation::Rejected(e.into())
            }
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Place an order for the current cart. Signed-in users only.
    ///
    /// The applied coupon code is sent along. On success the local cart and
    /// coupon state are reset.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AuthenticationRequired`] for guests, or the
    /// backend error if the order is refused.
    #[instrument(skip(self))]
    pub async fn checkout(
        &mut self,
        address_id: AddressId,
        payment_method_id: PaymentMethodId,
    ) -> Result<PlacedOrder, CartError> {
        let token = match self.bearer() {
            Ok(token) => token,
            Err(e) => {
                self.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        let request = CheckoutRequest {
            address_id,
            payment_method_id,
            coupon_code: self.state.applied_coupon().map(|c| c.code.clone()),
        };

        match self.api.checkout(&token, &request).await {
            Ok(order) => {
                self.state = CartState::default();
                add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
                self.notify(Notification::success(format!("Order {} placed", order.id)));
                Ok(order)
            }
            Err(e) => {
                let e = CartError::from(e);
                self.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    fn reject(&self, error: CartError) -> Reconciliation {
        self.notify(Notification::error(error.user_message()));
        Reconciliation::Rejected(error)
    }
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("was_guest", &self.was_guest)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
