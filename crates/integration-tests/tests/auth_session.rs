//! Login, logout and session restore against the fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;

use saverush_core::{ProductId, UserId};
use saverush_integration_tests::{FakeBackend, REJECTED_ID_TOKEN};
use saverush_storefront::models::Session;
use saverush_storefront::services::auth::{AuthError, LoginOutcome};
use saverush_storefront::services::cart::{RecordingNotifier, SessionSync};
use saverush_storefront::state::AppState;

fn id_token(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn test_rejected_login_keeps_guest_session() {
    let backend = FakeBackend::start().await;
    backend.add_product("p-a", "Atta 5kg", Decimal::new(50, 0));
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(backend.config(dir.path().join("state.json"))).unwrap();
    let auth = state.auth_service();

    let guest = auth.restore().unwrap();
    let guest_token = guest.guest_token().cloned().unwrap();
    let mut cart = state.cart_manager(Arc::new(RecordingNotifier::new()));
    let _ = cart.sync_session(guest).await.unwrap();

    let product = state.backend().get_product(&ProductId::new("p-a")).await.unwrap();
    let _ = cart.add_to_cart(product.into()).await;

    let outcome = auth.login(&id_token(REJECTED_ID_TOKEN)).await.unwrap();
    let LoginOutcome::Degraded { reason, session } = outcome else {
        panic!("expected a degraded login");
    };
    assert!(matches!(reason, AuthError::Backend(_)));
    assert_eq!(session.guest_token(), Some(&guest_token));

    let sync = cart.sync_session(session).await.unwrap();
    assert!(matches!(sync, SessionSync::Unchanged));
    assert_eq!(cart.total_items(), 1);
    assert!(backend.calls_to("/cart/add").is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_degrades_to_guest() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = backend.config(dir.path().join("state.json"));
    drop(backend);

    let state = AppState::new(config).unwrap();
    let outcome = state.auth_service().login(&id_token("alice")).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Degraded { .. }));
    assert!(outcome.session().is_guest());
}

#[tokio::test]
async fn test_login_persists_across_restart() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let state = AppState::new(backend.config(path.clone())).unwrap();
    let outcome = state.auth_service().login(&id_token("frank")).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));

    let reopened = AppState::new(backend.config(path)).unwrap();
    let session = reopened.auth_service().restore().unwrap();
    let user = session.user().unwrap();
    assert_eq!(user.id, UserId::new(FakeBackend::user_id_for("frank")));
    assert_eq!(user.phone.as_ref().unwrap().as_str(), "+919876543210");
    assert!(user.expires_at.is_some());
}

#[tokio::test]
async fn test_logout_starts_fresh_guest_cart() {
    let backend = FakeBackend::start().await;
    backend.add_product("p-a", "Atta 5kg", Decimal::new(50, 0));
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(backend.config(dir.path().join("state.json"))).unwrap();
    let auth = state.auth_service();

    let old_guest = auth.restore().unwrap();
    let old_token = old_guest.guest_token().cloned().unwrap();
    let mut cart = state.cart_manager(Arc::new(RecordingNotifier::new()));
    let _ = cart.sync_session(old_guest).await.unwrap();

    let session = auth.login(&id_token("gina")).await.unwrap().into_session();
    let _ = cart.sync_session(session).await.unwrap();
    let product = state.backend().get_product(&ProductId::new("p-a")).await.unwrap();
    assert!(cart.add_to_cart(product.into()).await.is_confirmed());

    let new_guest = auth.logout().unwrap();
    assert_ne!(new_guest.token, old_token);

    let sync = cart.sync_session(Session::Guest(new_guest)).await.unwrap();
    assert!(matches!(sync, SessionSync::Reloaded { migration: None }));
    assert!(cart.items().is_empty());

    // The backend cart stays with the account.
    assert_eq!(
        backend.cart_of(&FakeBackend::user_id_for("gina")),
        vec![("p-a".to_string(), 1)]
    );

    let restored = auth.restore().unwrap();
    assert!(restored.is_guest());
}
