//! Server-driven coupon pricing and checkout for signed-in shoppers.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use tempfile::TempDir;

use saverush_core::{AddressId, CouponId, PaymentMethodId, ProductId};
use saverush_integration_tests::FakeBackend;
use saverush_storefront::services::cart::{
    CartError, CartManager, NotificationLevel, RecordingNotifier, Reconciliation,
};
use saverush_storefront::state::AppState;

struct Shopper {
    backend: FakeBackend,
    state: AppState,
    cart: CartManager,
    notifier: Arc<RecordingNotifier>,
    _dir: TempDir,
}

/// A signed-in shopper with 2 x p-a (50) and 1 x p-b (30) in the cart.
async fn signed_in_shopper() -> Shopper {
    let backend = FakeBackend::start().await;
    backend.add_product("p-a", "Atta 5kg", Decimal::new(50, 0));
    backend.add_product("p-b", "Bread", Decimal::new(30, 0));
    backend.add_coupon("c-save40", "SAVE40", Decimal::new(40, 0));

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(backend.config(dir.path().join("state.json"))).unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let mut cart = state.cart_manager(notifier.clone());

    let session = state
        .auth_service()
        .login(&SecretString::from(String::from("erin")))
        .await
        .unwrap()
        .into_session();
    let _ = cart.sync_session(session).await.unwrap();

    for id in ["p-a", "p-a", "p-b"] {
        let product = state.backend().get_product(&ProductId::new(id)).await.unwrap();
        assert!(cart.add_to_cart(product.into()).await.is_confirmed());
    }

    Shopper {
        backend,
        state,
        cart,
        notifier,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_coupon_overrides_local_total() {
    let mut shopper = signed_in_shopper().await;
    assert_eq!(shopper.cart.total_price(), Decimal::new(130, 0));

    let outcome = shopper.cart.apply_coupon(&CouponId::new("c-save40")).await;
    assert!(outcome.is_confirmed());

    assert_eq!(shopper.cart.total_price(), Decimal::new(90, 0));
    assert_eq!(shopper.cart.original_price(), Some(Decimal::new(130, 0)));
    assert_eq!(shopper.cart.applied_coupon().unwrap().code, "SAVE40");

    // Later item changes do not recompute the server's discounted price.
    let bread = shopper
        .state
        .backend()
        .get_product(&ProductId::new("p-b"))
        .await
        .unwrap();
    assert!(shopper.cart.add_to_cart(bread.into()).await.is_confirmed());
    assert_eq!(shopper.cart.subtotal(), Decimal::new(160, 0));
    assert_eq!(shopper.cart.total_price(), Decimal::new(90, 0));
}

#[tokio::test]
async fn test_coupon_survives_emptied_cart() {
    let mut shopper = signed_in_shopper().await;
    let _ = shopper.cart.apply_coupon(&CouponId::new("c-save40")).await;

    assert!(
        shopper
            .cart
            .remove_from_cart(&ProductId::new("p-a"))
            .await
            .is_confirmed()
    );
    assert!(
        shopper
            .cart
            .remove_from_cart(&ProductId::new("p-b"))
            .await
            .is_confirmed()
    );

    assert!(shopper.cart.items().is_empty());
    assert_eq!(
        shopper.cart.applied_coupon().map(|c| c.id.clone()),
        Some(CouponId::new("c-save40"))
    );

    assert!(shopper.cart.remove_coupon().await.is_confirmed());
    assert!(shopper.cart.applied_coupon().is_none());
    assert_eq!(shopper.cart.total_price(), Decimal::ZERO);
}

#[tokio::test]
async fn test_invalid_coupon_shows_server_message() {
    let mut shopper = signed_in_shopper().await;

    let outcome = shopper.cart.apply_coupon(&CouponId::new("c-bogus")).await;
    assert!(matches!(
        outcome,
        Reconciliation::Rejected(CartError::Backend(_))
    ));

    let last = shopper.notifier.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert_eq!(last.message, "Invalid coupon code");

    assert!(shopper.cart.applied_coupon().is_none());
    assert_eq!(shopper.cart.total_price(), Decimal::new(130, 0));
}

#[tokio::test]
async fn test_checkout_sends_coupon_and_resets_cart() {
    let mut shopper = signed_in_shopper().await;
    let _ = shopper.cart.apply_coupon(&CouponId::new("c-save40")).await;

    let order = shopper
        .cart
        .checkout(AddressId::new("addr-1"), PaymentMethodId::new("pm-1"))
        .await
        .unwrap();

    assert_eq!(order.id.as_str(), "order-1");
    assert_eq!(order.total_amount, Decimal::new(90, 0));

    let calls = shopper.backend.calls_to("/cart/checkout");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body["addressId"], "addr-1");
    assert_eq!(calls[0].body["paymentMethodId"], "pm-1");
    assert_eq!(calls[0].body["couponCode"], "SAVE40");

    assert!(shopper.cart.items().is_empty());
    assert!(shopper.cart.applied_coupon().is_none());
    assert_eq!(shopper.backend.orders().len(), 1);
}

#[tokio::test]
async fn test_quantity_updates_reach_backend() {
    let mut shopper = signed_in_shopper().await;
    let user = FakeBackend::user_id_for("erin");

    assert!(
        shopper
            .cart
            .update_quantity(&ProductId::new("p-a"), 150)
            .await
            .is_confirmed()
    );
    assert_eq!(
        shopper.backend.cart_of(&user),
        vec![("p-a".to_string(), 99), ("p-b".to_string(), 1)]
    );

    assert!(
        shopper
            .cart
            .update_quantity(&ProductId::new("p-b"), 0)
            .await
            .is_confirmed()
    );
    assert_eq!(shopper.backend.cart_of(&user), vec![("p-a".to_string(), 99)]);
    assert_eq!(shopper.cart.total_items(), 99);
}
