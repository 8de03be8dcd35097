//! Checkout command.

use saverush_core::{AddressId, PaymentMethodId};
use saverush_storefront::error::AppError;
use saverush_storefront::services::cart::CartManager;

use crate::output;

/// Place an order for the current cart.
///
/// # Errors
///
/// Returns an error for guests, empty carts or refused orders.
pub async fn run(cart: &mut CartManager, address: String, payment: String) -> Result<(), AppError> {
    if cart.items().is_empty() {
        return Err(AppError::BadRequest("your cart is empty".to_string()));
    }

    let order = cart
        .checkout(AddressId::new(address), PaymentMethodId::new(payment))
        .await?;
    output::order(&order);
    Ok(())
}
