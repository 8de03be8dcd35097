//! Authentication service.
//!
//! Owns the session identity persisted in the key-value store: a guest
//! session under `guest_session` and the backend login under `auth_token`.
//! Phone verification happens elsewhere; [`AuthService::login`] receives the
//! resulting ID token and exchanges it for a backend JWT.

mod error;
mod jwt;

pub use error::AuthError;
pub use jwt::{JwtClaims, decode_claims};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use saverush_core::{PhoneNumber, UserId};

use crate::backend::AuthApi;
use crate::models::{AuthenticatedUser, BearerToken, GuestSession, Session, keys};
use crate::services::cart::GuestCartStorage;
use crate::storage::{KeyValueStore, read_json, write_json};

/// Persisted backend login (the auth cookie analogue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuth {
    pub token: String,
    pub user_id: UserId,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredAuth {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    fn into_user(self) -> AuthenticatedUser {
        AuthenticatedUser {
            phone: self.phone.as_deref().and_then(|p| PhoneNumber::parse(p).ok()),
            id: self.user_id,
            token: BearerToken::new(self.token),
            expires_at: self.expires_at,
        }
    }
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// The backend accepted the ID token.
    Authenticated(Session),
    /// The backend login failed; the shopper continues as a guest.
    Degraded {
        reason: AuthError,
        session: Session,
    },
}

impl LoginOutcome {
    /// The session to continue with.
    #[must_use]
    pub const fn session(&self) -> &Session {
        match self {
            Self::Authenticated(session) | Self::Degraded { session, .. } => session,
        }
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        match self {
            Self::Authenticated(session) | Self::Degraded { session, .. } => session,
        }
    }
}

/// Authentication service.
///
/// Handles guest sessions, backend login and logout.
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { api, storage }
    }

    // =========================================================================
    // Session restore
    // =========================================================================

    /// Restore the persisted session.
    ///
    /// A valid login wins. Expired or unreadable logins are discarded and the
    /// shopper continues as a guest, with a fresh guest session if needed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the key-value store fails.
    pub fn restore(&self) -> Result<Session, AuthError> {
        self.restore_at(Utc::now())
    }

    fn restore_at(&self, now: DateTime<Utc>) -> Result<Session, AuthError> {
        match read_json::<StoredAuth>(self.storage.as_ref(), keys::AUTH_TOKEN) {
            Ok(Some(stored)) if !stored.is_expired(now) => {
                return Ok(Session::Authenticated(stored.into_user()));
            }
            Ok(Some(_)) => {
                info!("stored login expired, continuing as guest");
                self.storage.remove(keys::AUTH_TOKEN)?;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored login");
                self.storage.remove(keys::AUTH_TOKEN)?;
            }
        }

        Ok(Session::Guest(self.ensure_guest(now)?))
    }

    /// The persisted guest session, replaced if missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the key-value store fails.
    pub fn ensure_guest(&self, now: DateTime<Utc>) -> Result<GuestSession, AuthError> {
        let existing = read_json::<GuestSession>(self.storage.as_ref(), keys::GUEST_SESSION)
            .unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable guest session");
                None
            });

        if let Some(guest) = existing.filter(|guest| !guest.is_expired(now)) {
            return Ok(guest);
        }

        self.issue_guest(now)
    }

    fn issue_guest(&self, now: DateTime<Utc>) -> Result<GuestSession, AuthError> {
        let guest = GuestSession::issue(now);
        write_json(self.storage.as_ref(), keys::GUEST_SESSION, &guest)?;
        info!(guest_token = %guest.token, "issued guest session");
        Ok(guest)
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Exchange a phone-auth ID token for a backend login.
    ///
    /// Never blocks the shopper: if the exchange fails the outcome is
    /// [`LoginOutcome::Degraded`] carrying the guest session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the session cannot be persisted.
    #[instrument(skip_all)]
    pub async fn login(&self, id_token: &SecretString) -> Result<LoginOutcome, AuthError> {
        let now = Utc::now();
        match self.exchange(id_token, now).await {
            Ok(stored) => {
                write_json(self.storage.as_ref(), keys::AUTH_TOKEN, &stored)?;
                info!(user_id = %stored.user_id, "logged in");
                Ok(LoginOutcome::Authenticated(Session::Authenticated(
                    stored.into_user(),
                )))
            }
            Err(reason) => {
                warn!(error = %reason, "backend login failed, continuing as guest");
                let guest = self.ensure_guest(now)?;
                Ok(LoginOutcome::Degraded {
                    reason,
                    session: Session::Guest(guest),
                })
            }
        }
    }

    async fn exchange(
        &self,
        id_token: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<StoredAuth, AuthError> {
        let response = self.api.exchange_token(id_token).await?;
        let claims = decode_claims(&response.token)?;

        let user_id = response
            .user
            .as_ref()
            .map(|user| user.id.as_str())
            .filter(|id| !id.is_empty())
            .or_else(|| claims.subject())
            .map(UserId::new)
            .ok_or(AuthError::MissingUserId)?;

        let stored = StoredAuth {
            phone: response
                .user
                .and_then(|user| user.phone)
                .or(claims.phone.clone()),
            expires_at: claims.expires_at(),
            user_id,
            token: response.token,
        };

        if stored.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }
        Ok(stored)
    }

    /// Sign out and start a fresh guest session.
    ///
    /// The previous guest cart is cleared so the new guest starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    #[instrument(skip_all)]
    pub fn logout(&self) -> Result<GuestSession, AuthError> {
        self.storage.remove(keys::AUTH_TOKEN)?;

        if let Ok(Some(old)) = read_json::<GuestSession>(self.storage.as_ref(), keys::GUEST_SESSION)
        {
            GuestCartStorage::new(Arc::clone(&self.storage), &old.token).clear_cart()?;
        }

        let guest = self.issue_guest(Utc::now())?;
        info!("logged out");
        Ok(guest)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use saverush_core::{CartItem, ProductId};

    use super::*;
    use crate::backend::{BackendError, BackendUser, LoginResponse, MockAuthApi};
    use crate::storage::MemoryStorage;

    fn jwt(payload: &serde_json::Value) -> String {
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string()))
    }

    fn service(api: MockAuthApi) -> (AuthService, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (AuthService::new(Arc::new(api), storage.clone()), storage)
    }

    fn id_token() -> SecretString {
        SecretString::from("firebase-id-token".to_string())
    }

    #[test]
    fn test_restore_issues_and_reuses_guest() {
        let (auth, _) = service(MockAuthApi::new());
        let first = auth.restore().unwrap();
        let second = auth.restore().unwrap();
        assert!(first.is_guest());
        assert_eq!(first.guest_token(), second.guest_token());
    }

    #[test]
    fn test_expired_guest_is_replaced() {
        let (auth, _) = service(MockAuthApi::new());
        let now = Utc::now();
        let old = auth.ensure_guest(now).unwrap();
        let later = auth.ensure_guest(now + Duration::days(8)).unwrap();
        assert_ne!(old.token, later.token);
    }

    #[test]
    fn test_restore_expired_login_falls_back_to_guest() {
        let (auth, storage) = service(MockAuthApi::new());
        let stored = StoredAuth {
            token: "t".to_string(),
            user_id: UserId::new("u1"),
            phone: None,
            expires_at: Some(Utc::now() - Duration::hours(1)),
        };
        write_json(storage.as_ref(), keys::AUTH_TOKEN, &stored).unwrap();

        let session = auth.restore().unwrap();
        assert!(session.is_guest());
        assert_eq!(storage.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_restore_corrupt_login_falls_back_to_guest() {
        let (auth, storage) = service(MockAuthApi::new());
        storage.set(keys::AUTH_TOKEN, "garbage").unwrap();
        assert!(auth.restore().unwrap().is_guest());
    }

    #[test]
    fn test_restore_recovers_from_unreadable_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let storage = Arc::new(crate::storage::FileStorage::open(&path).unwrap());
        let auth = AuthService::new(Arc::new(MockAuthApi::new()), storage);

        let first = auth.restore().unwrap();
        assert!(first.is_guest());
        assert_eq!(auth.restore().unwrap().guest_token(), first.guest_token());
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let exp = (Utc::now() + Duration::days(1)).timestamp();
        let token = jwt(&serde_json::json!({"userId": "u1", "exp": exp}));
        let mut api = MockAuthApi::new();
        api.expect_exchange_token().times(1).returning(move |_| {
            Ok(LoginResponse {
                token: token.clone(),
                user: Some(BackendUser {
                    id: "u1".to_string(),
                    phone: Some("9876543210".to_string()),
                }),
            })
        });
        let (auth, _) = service(api);

        let outcome = auth.login(&id_token()).await.unwrap();
        let LoginOutcome::Authenticated(session) = outcome else {
            panic!("expected authenticated login");
        };
        let user = session.user().unwrap();
        assert_eq!(user.id, UserId::new("u1"));
        assert_eq!(user.phone.as_ref().unwrap().as_str(), "+919876543210");

        let restored = auth.restore().unwrap();
        assert_eq!(restored.user().unwrap().id, UserId::new("u1"));
    }

    #[tokio::test]
    async fn test_login_uses_claims_without_user() {
        let token = jwt(&serde_json::json!({"sub": "u9"}));
        let mut api = MockAuthApi::new();
        api.expect_exchange_token().returning(move |_| {
            Ok(LoginResponse {
                token: token.clone(),
                user: None,
            })
        });
        let (auth, _) = service(api);

        let outcome = auth.login(&id_token()).await.unwrap();
        assert_eq!(outcome.session().user().unwrap().id, UserId::new("u9"));
    }

    #[tokio::test]
    async fn test_login_failure_degrades_to_guest() {
        let mut api = MockAuthApi::new();
        api.expect_exchange_token()
            .returning(|_| Err(BackendError::Unauthorized));
        let (auth, storage) = service(api);
        let guest = auth.restore().unwrap();

        let outcome = auth.login(&id_token()).await.unwrap();

        let LoginOutcome::Degraded { reason, session } = outcome else {
            panic!("expected degraded login");
        };
        assert!(matches!(reason, AuthError::Backend(BackendError::Unauthorized)));
        assert_eq!(session.guest_token(), guest.guest_token());
        assert_eq!(storage.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_with_expired_token_degrades() {
        let exp = (Utc::now() - Duration::minutes(5)).timestamp();
        let token = jwt(&serde_json::json!({"userId": "u1", "exp": exp}));
        let mut api = MockAuthApi::new();
        api.expect_exchange_token().returning(move |_| {
            Ok(LoginResponse {
                token: token.clone(),
                user: None,
            })
        });
        let (auth, _) = service(api);

        let outcome = auth.login(&id_token()).await.unwrap();
        assert!(matches!(
            outcome,
            LoginOutcome::Degraded {
                reason: AuthError::TokenExpired,
                ..
            }
        ));
    }

    #[test]
    fn test_logout_clears_guest_cart_and_rotates_token() {
        let (auth, storage) = service(MockAuthApi::new());
        let old = auth.ensure_guest(Utc::now()).unwrap();
        let cart = GuestCartStorage::new(storage.clone(), &old.token);
        cart.add_item_with_details(
            CartItem::new(ProductId::new("a"), "A", "", Decimal::new(50, 0)),
            1,
        )
        .unwrap();
        storage.set(keys::AUTH_TOKEN, "{}").unwrap();

        let fresh = auth.logout().unwrap();

        assert_ne!(fresh.token, old.token);
        assert_eq!(storage.get(cart.key()).unwrap(), None);
        assert_eq!(storage.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(auth.restore().unwrap().guest_token(), Some(&fresh.token));
    }
}
