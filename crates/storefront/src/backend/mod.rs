//! SaveRush backend REST client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, one shared connection pool per [`BackendClient`]
//! - The backend is the source of truth for authenticated carts, coupons
//!   and orders; nothing here is persisted locally
//! - Product lookups are cached in memory via `moka`; cart calls never are
//!
//! # Seams
//!
//! Cart and auth calls go through the [`CartApi`] and [`AuthApi`] traits so
//! the cart services can run against a fake backend in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use saverush_storefront::backend::{BackendClient, CartApi};
//!
//! let client = BackendClient::new(&config.backend);
//! let cart = client.add_item(&token, &ProductId::new("p1"), 2).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use saverush_core::{CouponId, ProductId};

use crate::models::BearerToken;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend rejected the request with a message (`success: false`).
    #[error("Backend error: {message}")]
    Api {
        /// Message supplied by the backend.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend-supplied message or a truncated body.
        message: String,
    },

    /// The bearer token was missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The envelope carried no data where data was required.
    #[error("Empty response from backend")]
    EmptyResponse,

    /// An id that cannot be used as a URL path segment.
    #[error("Invalid id for request path: {0:?}")]
    InvalidId(String),
}

impl BackendError {
    /// Message the backend supplied for the user, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message } | Self::Status { message, .. } if !message.is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Authenticated cart, coupon and checkout endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`
    async fn get_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError>;

    /// `POST /cart/add`; adds `quantity` units to the existing line.
    async fn add_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError>;

    /// `PUT /cart/update`; sets the line quantity.
    async fn update_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError>;

    /// `DELETE /cart/remove/:id`
    async fn remove_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError>;

    /// `DELETE /cart/clear`
    async fn clear_cart(&self, token: &BearerToken) -> Result<(), BackendError>;

    /// `POST /cart/checkout`
    async fn checkout(
        &self,
        token: &BearerToken,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, BackendError>;

    /// `POST /coupons/apply`
    async fn apply_coupon(
        &self,
        token: &BearerToken,
        coupon_id: &CouponId,
    ) -> Result<CouponPricing, BackendError>;

    /// `POST /coupons/remove`
    async fn remove_coupon(&self, token: &BearerToken) -> Result<CouponPricing, BackendError>;
}

/// Backend login endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`; exchanges a phone-auth ID token for a backend JWT.
    async fn exchange_token(&self, id_token: &SecretString) -> Result<LoginResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("product p1".to_string());
        assert_eq!(err.to_string(), "Not found: product p1");

        let err = BackendError::Status {
            status: 502,
            message: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: upstream down");
    }

    #[test]
    fn test_server_message() {
        let err = BackendError::Api {
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.server_message(), Some("Coupon expired"));

        let err = BackendError::Api {
            message: String::new(),
        };
        assert_eq!(err.server_message(), None);

        assert_eq!(BackendError::Unauthorized.server_message(), None);
    }

    #[test]
    fn test_rate_limited_error() {
        let err = BackendError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
