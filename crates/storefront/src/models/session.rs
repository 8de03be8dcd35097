//! Session-related types.
//!
//! Exactly one identity is active at a time: a guest identified by a locally
//! generated token, or a user authenticated with a backend bearer token.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use saverush_core::{PhoneNumber, UserId};

/// How long a guest token stays valid after it is issued (7 days).
pub const GUEST_SESSION_TTL_DAYS: i64 = 7;

/// Opaque guest session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("guest_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing token value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted guest session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSession {
    pub token: GuestToken,
    pub expires_at: DateTime<Utc>,
}

impl GuestSession {
    /// Start a new guest session issued at `now`.
    #[must_use]
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            token: GuestToken::generate(),
            expires_at: now + Duration::days(GUEST_SESSION_TTL_DAYS),
        }
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Backend JWT presented as `Authorization: Bearer`.
///
/// Wraps a [`SecretString`] so the token never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// A user signed in against the backend.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub phone: Option<PhoneNumber>,
    pub token: BearerToken,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Which kind of identity a session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Guest,
    Authenticated,
}

/// The active session identity.
#[derive(Debug, Clone)]
pub enum Session {
    Guest(GuestSession),
    Authenticated(AuthenticatedUser),
}

/// Identity key observed by the cart manager.
///
/// The cart is reloaded whenever this changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: Option<UserId>,
    pub is_guest: bool,
    pub guest_token: Option<GuestToken>,
}

impl Session {
    /// The session kind.
    #[must_use]
    pub const fn kind(&self) -> SessionKind {
        match self {
            Self::Guest(_) => SessionKind::Guest,
            Self::Authenticated(_) => SessionKind::Authenticated,
        }
    }

    /// Whether this is a guest session.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    /// The authenticated user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Guest(_) => None,
        }
    }

    /// The guest token, if any.
    #[must_use]
    pub const fn guest_token(&self) -> Option<&GuestToken> {
        match self {
            Self::Guest(guest) => Some(&guest.token),
            Self::Authenticated(_) => None,
        }
    }

    /// Identity key used for change detection.
    #[must_use]
    pub fn key(&self) -> SessionKey {
        SessionKey {
            user_id: self.user().map(|u| u.id.clone()),
            is_guest: self.is_guest(),
            guest_token: self.guest_token().cloned(),
        }
    }
}

/// Storage keys for session and cart data.
pub mod keys {
    /// Key for the persisted backend login.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Key for the persisted guest session.
    pub const GUEST_SESSION: &str = "guest_session";

    /// Prefix for guest carts; the guest token is appended.
    pub const GUEST_CART_PREFIX: &str = "guest_cart_";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_token_format() {
        let token = GuestToken::generate();
        assert!(token.as_str().starts_with("guest_"));
        assert_eq!(token.as_str().len(), "guest_".len() + 32);
        assert_ne!(token, GuestToken::generate());
    }

    #[test]
    fn test_guest_session_expiry() {
        let now = Utc::now();
        let session = GuestSession::issue(now);
        assert!(!session.is_expired(now));
        assert!(!session.is_expired(now + Duration::days(6)));
        assert!(session.is_expired(now + Duration::days(7)));
    }

    #[test]
    fn test_bearer_token_debug_redacted() {
        let token = BearerToken::new("eyJhbGciOi.secret.sig");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(token.expose(), "eyJhbGciOi.secret.sig");
    }

    #[test]
    fn test_session_key_changes_with_identity() {
        let guest = Session::Guest(GuestSession::issue(Utc::now()));
        let user = Session::Authenticated(AuthenticatedUser {
            id: UserId::new("u1"),
            phone: None,
            token: BearerToken::new("t"),
            expires_at: None,
        });

        assert!(guest.key().is_guest);
        assert!(guest.key().guest_token.is_some());
        assert!(!user.key().is_guest);
        assert_eq!(user.key().user_id, Some(UserId::new("u1")));
        assert_ne!(guest.key(), user.key());
    }
}
