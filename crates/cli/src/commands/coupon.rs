//! Coupon commands.

use saverush_core::CouponId;
use saverush_storefront::error::AppError;
use saverush_storefront::services::cart::CartManager;

use super::settle;

/// Apply a coupon to the signed-in user's cart.
///
/// # Errors
///
/// Returns an error if the server refuses the coupon.
pub async fn apply(cart: &mut CartManager, id: &str) -> Result<(), AppError> {
    let outcome = cart.apply_coupon(&CouponId::new(id)).await;
    settle(outcome, cart)
}

/// Remove the applied coupon.
///
/// # Errors
///
/// Returns an error if the server call fails.
pub async fn remove(cart: &mut CartManager) -> Result<(), AppError> {
    let outcome = cart.remove_coupon().await;
    settle(outcome, cart)
}
