//! Cart commands.

use rust_decimal::Decimal;
use tracing::instrument;

use saverush_core::{CartItem, ProductId};
use saverush_storefront::error::AppError;
use saverush_storefront::services::cart::CartManager;
use saverush_storefront::state::AppState;

use super::settle;

/// Explicit product details given on the command line.
pub type ItemDetails = (String, Decimal, String);

/// Add one unit of each product.
///
/// Without explicit details each product is looked up in the catalog.
///
/// # Errors
///
/// Returns an error if a lookup fails or an add is not confirmed.
#[instrument(skip(state, cart, details))]
pub async fn add(
    state: &AppState,
    cart: &mut CartManager,
    ids: Vec<String>,
    details: Option<ItemDetails>,
) -> Result<(), AppError> {
    if details.is_some() && ids.len() > 1 {
        return Err(AppError::BadRequest(
            "--name and --price apply to a single product".to_string(),
        ));
    }

    let mut details = details;
    for id in ids {
        let id = ProductId::new(id);
        let item = match details.take() {
            Some((name, price, image)) => CartItem::new(id, name, image, price),
            None => state.backend().get_product(&id).await?.into(),
        };
        settle(cart.add_to_cart(item).await, cart)?;
    }
    Ok(())
}

/// Set the quantity of a line.
///
/// # Errors
///
/// Returns an error if the update is not confirmed.
pub async fn update(cart: &mut CartManager, id: &str, quantity: u32) -> Result<(), AppError> {
    let outcome = cart.update_quantity(&ProductId::new(id), quantity).await;
    settle(outcome, cart)
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the removal is not confirmed.
pub async fn remove(cart: &mut CartManager, id: &str) -> Result<(), AppError> {
    let outcome = cart.remove_from_cart(&ProductId::new(id)).await;
    settle(outcome, cart)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if clearing is not confirmed.
pub async fn clear(cart: &mut CartManager) -> Result<(), AppError> {
    let outcome = cart.clear_cart().await;
    settle(outcome, cart)
}
