//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front ends built on the library.
//! Errors worth investigating are captured to Sentry via [`AppError::capture`]
//! before they are reported to the shopper.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad input from the shopper.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error indicates a fault rather than a shopper mistake.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        match self {
            Self::Backend(_) | Self::Storage(_) => true,
            Self::Cart(err) => matches!(err, CartError::Backend(_) | CartError::GuestStorage(_)),
            Self::Auth(err) => matches!(err, AuthError::Storage(_) | AuthError::GuestCart(_)),
            Self::Config(_) | Self::BadRequest(_) => false,
        }
    }

    /// Capture faults to Sentry and log them.
    pub fn capture(&self) {
        if self.is_fault() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }

    /// Message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(err) => err.user_message(),
            Self::Backend(err) => err
                .server_message()
                .map_or_else(|| "External service error".to_string(), str::to_string),
            Self::Storage(_) => "Could not access local storage".to_string(),
            Self::Auth(AuthError::Backend(_) | AuthError::MalformedToken(_)) => {
                "Sign-in failed, please try again".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, phone: Option<&str>) {
    sentry::configure_scope(|scope| {
        let mut user = sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        };
        if let Some(phone) = phone {
            user.other
                .insert("phone".to_string(), serde_json::Value::String(phone.to_string()));
        }
        scope.set_user(Some(user));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
