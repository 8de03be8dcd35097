//! Guest cart persistence.
//!
//! A guest cart is a single JSON snapshot stored under
//! `guest_cart_<guest token>` in the client key-value store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use saverush_core::{CartItem, ProductId, Quantity, subtotal};

use crate::models::{GuestToken, keys};
use crate::storage::{KeyValueStore, StorageError, write_json};

/// Errors raised by [`GuestCartStorage`].
#[derive(Debug, Error)]
pub enum GuestCartError {
    /// The key-value store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The product is not in the guest cart.
    #[error("item not in guest cart: {0}")]
    ItemNotFound(ProductId),
}

/// Persisted guest cart snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GuestCart {
    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

/// Guest cart adapter over a [`KeyValueStore`].
#[derive(Clone)]
pub struct GuestCartStorage {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl GuestCartStorage {
    /// Bind the adapter to the cart of `token`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, token: &GuestToken) -> Self {
        Self {
            storage,
            key: Self::storage_key(token),
        }
    }

    /// Storage key for the cart of `token`.
    #[must_use]
    pub fn storage_key(token: &GuestToken) -> String {
        format!("{}{}", keys::GUEST_CART_PREFIX, token.as_str())
    }

    /// The key this adapter reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the guest cart.
    ///
    /// A missing or unparsable entry reads as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store itself cannot be read.
    pub fn get_cart(&self) -> Result<GuestCart, GuestCartError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(GuestCart::default());
        };

        match serde_json::from_str(&raw) {
            Ok(cart) => Ok(cart),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable guest cart");
                Ok(GuestCart::default())
            }
        }
    }

    /// Persist `items`, recomputing the total and stamping `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save_cart(&self, items: Vec<CartItem>) -> Result<GuestCart, GuestCartError> {
        let cart = GuestCart {
            total_price: subtotal(&items),
            items,
            updated_at: Some(Utc::now()),
        };
        write_json(self.storage.as_ref(), &self.key, &cart)?;
        debug!(key = %self.key, lines = cart.items.len(), "guest cart saved");
        Ok(cart)
    }

    /// Add `quantity` units to a line already in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`GuestCartError::ItemNotFound`] if the line does not exist.
    pub fn add_item(&self, id: &ProductId, quantity: u32) -> Result<GuestCart, GuestCartError> {
        let mut cart = self.get_cart()?;
        let line = cart
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| GuestCartError::ItemNotFound(id.clone()))?;
        line.quantity = line.quantity.saturating_add(quantity);
        self.save_cart(cart.items)
    }

    /// Add `quantity` units of `item`, inserting the line if it is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn add_item_with_details(
        &self,
        item: CartItem,
        quantity: u32,
    ) -> Result<GuestCart, GuestCartError> {
        let mut cart = self.get_cart()?;
        match cart.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => cart
                .items
                .push(item.with_quantity(Quantity::clamped(quantity))),
        }
        self.save_cart(cart.items)
    }

    /// Set the quantity of a line. Zero removes it; values above 99 clamp.
    ///
    /// # Errors
    ///
    /// Returns [`GuestCartError::ItemNotFound`] if the line does not exist.
    pub fn update_item(&self, id: &ProductId, quantity: u32) -> Result<GuestCart, GuestCartError> {
        let mut cart = self.get_cart()?;
        let index = cart
            .position(id)
            .ok_or_else(|| GuestCartError::ItemNotFound(id.clone()))?;

        if quantity < Quantity::MIN.get() {
            cart.items.remove(index);
        } else if let Some(line) = cart.items.get_mut(index) {
            line.quantity = Quantity::clamped(quantity);
        }
        self.save_cart(cart.items)
    }

    /// Remove a line. Removing a missing line is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn remove_item(&self, id: &ProductId) -> Result<GuestCart, GuestCartError> {
        let mut cart = self.get_cart()?;
        cart.items.retain(|item| &item.id != id);
        self.save_cart(cart.items)
    }

    /// Delete the guest cart entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_cart(&self) -> Result<(), GuestCartError> {
        self.storage.remove(&self.key)?;
        debug!(key = %self.key, "guest cart cleared");
        Ok(())
    }
}

impl std::fmt::Debug for GuestCartStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestCartStorage")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
