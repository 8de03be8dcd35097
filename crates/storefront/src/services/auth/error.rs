//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::services::cart::GuestCartError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend refused or failed the token exchange.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session data could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The old guest cart could not be cleared.
    #[error("guest cart error: {0}")]
    GuestCart(#[from] GuestCartError),

    /// The backend token is not a readable JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Neither the login response nor the token named a user.
    #[error("token carries no user id")]
    MissingUserId,

    /// The backend issued a token that has already expired.
    #[error("token expired")]
    TokenExpired,
}
