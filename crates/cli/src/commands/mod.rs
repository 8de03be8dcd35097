//! Command implementations.

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod session;

use saverush_storefront::error::AppError;
use saverush_storefront::services::cart::{CartManager, Reconciliation};

use crate::output;

/// Turn a non-confirmed outcome into an error after reporting it.
///
/// Drifted and resynced outcomes still changed the cart, so the cart is
/// shown before failing.
fn settle(outcome: Reconciliation, cart: &CartManager) -> Result<(), AppError> {
    match outcome {
        Reconciliation::Confirmed => {
            output::cart(cart);
            Ok(())
        }
        Reconciliation::Drifted(e) => {
            output::warning("Your cart changed here but was not saved.");
            output::cart(cart);
            Err(e.into())
        }
        Reconciliation::Resynced(e) => {
            output::warning("Your cart was reloaded from the server.");
            output::cart(cart);
            Err(e.into())
        }
        Reconciliation::Rejected(e) => Err(e.into()),
    }
}
