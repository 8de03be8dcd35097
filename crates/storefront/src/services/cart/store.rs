//! Persistence backends for the cart.
//!
//! The active store is chosen from the session kind: guests persist to the
//! local key-value store, signed-in users to the backend.

use std::sync::Arc;

use async_trait::async_trait;

use saverush_core::{AppliedCoupon, CartItem, ProductId};

use super::error::CartError;
use super::guest::{GuestCart, GuestCartStorage};
use super::state::{CartState, ServerPricing};
use crate::backend::{CartApi, RemoteCart};
use crate::models::{BearerToken, SessionKind};

/// An authoritative view of the cart as loaded from a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub pricing: Option<ServerPricing>,
    pub applied_coupon: Option<AppliedCoupon>,
}

impl From<CartSnapshot> for CartState {
    fn from(snapshot: CartSnapshot) -> Self {
        Self::new(snapshot.items, snapshot.pricing, snapshot.applied_coupon)
    }
}

impl From<RemoteCart> for CartSnapshot {
    fn from(cart: RemoteCart) -> Self {
        // Server prices only override the local sum while a discount applies.
        let pricing = cart
            .current_price
            .zip(cart.original_price)
            .filter(|_| cart.applied_coupon.is_some())
            .map(|(current_price, original_price)| ServerPricing {
                current_price,
                original_price,
            });

        Self {
            items: cart.items.into_iter().map(CartItem::from).collect(),
            pricing,
            applied_coupon: cart.applied_coupon,
        }
    }
}

impl From<GuestCart> for CartSnapshot {
    fn from(cart: GuestCart) -> Self {
        Self {
            items: cart.items,
            pricing: None,
            applied_coupon: None,
        }
    }
}

/// Where cart mutations are persisted.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Session kind this store serves.
    fn kind(&self) -> SessionKind;

    /// Load the authoritative cart.
    async fn load(&self) -> Result<CartSnapshot, CartError>;

    /// Add `quantity` units of `item`.
    async fn add(&self, item: &CartItem, quantity: u32) -> Result<(), CartError>;

    /// Set the quantity of a line.
    async fn update(&self, id: &ProductId, quantity: u32) -> Result<(), CartError>;

    /// Remove a line.
    async fn remove(&self, id: &ProductId) -> Result<(), CartError>;

    /// Remove every line.
    async fn clear(&self) -> Result<(), CartError>;
}

/// Backend cart of a signed-in user.
pub struct RemoteCartStore {
    api: Arc<dyn CartApi>,
    token: BearerToken,
}

impl RemoteCartStore {
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, token: BearerToken) -> Self {
        Self { api, token }
    }
}

#[async_trait]
impl CartStore for RemoteCartStore {
    fn kind(&self) -> SessionKind {
        SessionKind::Authenticated
    }

    async fn load(&self) -> Result<CartSnapshot, CartError> {
        Ok(self.api.get_cart(&self.token).await?.into())
    }

    async fn add(&self, item: &CartItem, quantity: u32) -> Result<(), CartError> {
        self.api.add_item(&self.token, &item.id, quantity).await?;
        Ok(())
    }

    async fn update(&self, id: &ProductId, quantity: u32) -> Result<(), CartError> {
        self.api.update_item(&self.token, id, quantity).await?;
        Ok(())
    }

    async fn remove(&self, id: &ProductId) -> Result<(), CartError> {
        self.api.remove_item(&self.token, id).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.api.clear_cart(&self.token).await?;
        Ok(())
    }
}

/// Guest cart in local storage.
pub struct LocalCartStore {
    guest: GuestCartStorage,
}

impl LocalCartStore {
    #[must_use]
    pub const fn new(guest: GuestCartStorage) -> Self {
        Self { guest }
    }
}

#[async_trait]
impl CartStore for LocalCartStore {
    fn kind(&self) -> SessionKind {
        SessionKind::Guest
    }

    async fn load(&self) -> Result<CartSnapshot, CartError> {
        Ok(self.guest.get_cart()?.into())
    }

    async fn add(&self, item: &CartItem, quantity: u32) -> Result<(), CartError> {
        self.guest.add_item_with_details(item.clone(), quantity)?;
        Ok(())
    }

    async fn update(&self, id: &ProductId, quantity: u32) -> Result<(), CartError> {
        self.guest.update_item(id, quantity)?;
        Ok(())
    }

    async fn remove(&self, id: &ProductId) -> Result<(), CartError> {
        self.guest.remove_item(id)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.guest.clear_cart()?;
        Ok(())
    }
}
