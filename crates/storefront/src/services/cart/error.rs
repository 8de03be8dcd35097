//! Cart error types.

use thiserror::Error;

use saverush_core::ProductId;

use super::guest::GuestCartError;
use crate::backend::BackendError;

/// Fallback message shown when a coupon call fails without a server message.
pub const COUPON_FALLBACK_MESSAGE: &str = "Could not update the coupon. Please try again.";

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Reading or writing the guest cart failed.
    #[error("guest cart error: {0}")]
    GuestStorage(#[from] GuestCartError),

    /// The operation needs a signed-in user.
    #[error("sign in to use this feature")]
    AuthenticationRequired,

    /// No session has been attached to the cart manager yet.
    #[error("no active session")]
    NoSession,

    /// The product is not in the cart.
    #[error("item not in cart: {0}")]
    ItemNotFound(ProductId),
}

impl CartError {
    /// Message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(err) => err
                .server_message()
                .map_or_else(|| "Something went wrong. Please try again.".to_string(), str::to_string),
            Self::GuestStorage(_) => "Could not save your cart on this device.".to_string(),
            Self::AuthenticationRequired => "Please sign in to continue.".to_string(),
            Self::NoSession => "Your session is still loading.".to_string(),
            Self::ItemNotFound(_) => "That item is no longer in your cart.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = CartError::Backend(BackendError::Api {
            message: "Out of stock".to_string(),
        });
        assert_eq!(err.user_message(), "Out of stock");

        let err = CartError::Backend(BackendError::Unauthorized);
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn test_item_not_found_display() {
        let err = CartError::ItemNotFound(ProductId::new("p1"));
        assert_eq!(err.to_string(), "item not in cart: p1");
    }
}
