//! Wire types for the SaveRush backend.
//!
//! Every endpoint wraps its payload in an [`ApiEnvelope`]. Backend documents
//! use `_id` for identifiers, accepted here as an alias of `id`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saverush_core::{
    AddressId, AppliedCoupon, CartItem, CouponId, OrderId, OrderStatus, PaymentMethodId,
    ProductId, Quantity, VariantId,
};

// =============================================================================
// Envelope
// =============================================================================

/// Response wrapper used by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

const fn default_success() -> bool {
    true
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as returned by `GET /products/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default, alias = "image")]
    pub image_url: String,
    pub price: Decimal,
}

impl From<Product> for CartItem {
    fn from(product: Product) -> Self {
        Self::new(product.id, product.name, product.image_url, product.price)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<&'a VariantId>,
}

/// Body of `PUT /cart/update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// A cart line as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartLine {
    /// Populated product document.
    #[serde(alias = "productId")]
    pub product: Product,
    pub quantity: u32,
    /// Unit price captured when the line was added, if the backend tracks it.
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl From<RemoteCartLine> for CartItem {
    fn from(line: RemoteCartLine) -> Self {
        let base_price = line.price.unwrap_or(line.product.price);
        Self::new(
            line.product.id,
            line.product.name,
            line.product.image_url,
            base_price,
        )
        .with_quantity(Quantity::clamped(line.quantity))
    }
}

/// The authenticated user's cart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    /// Price after coupon discount.
    #[serde(default)]
    pub current_price: Option<Decimal>,
    /// Price before coupon discount.
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub applied_coupon: Option<AppliedCoupon>,
}

// =============================================================================
// Coupons
// =============================================================================

/// Body of `POST /coupons/apply`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponRequest<'a> {
    pub coupon_id: &'a CouponId,
}

/// Server-validated pricing returned by coupon endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPricing {
    pub current_price: Decimal,
    pub original_price: Decimal,
    #[serde(default)]
    pub applied_coupon: Option<AppliedCoupon>,
}

// =============================================================================
// Checkout
// =============================================================================

/// Body of `POST /cart/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address_id: AddressId,
    pub payment_method_id: PaymentMethodId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Order created by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(alias = "totalPrice")]
    pub total_amount: Decimal,
}

// =============================================================================
// Auth
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub id_token: &'a str,
}

/// User document returned with a login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Backend JWT.
    pub token: String,
    #[serde(default)]
    pub user: Option<BackendUser>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_cart_line_prefers_line_price() {
        let json = r#"{
            "productId": {"_id": "p1", "name": "Milk", "image": "milk.png", "price": 60},
            "quantity": 2,
            "price": 55
        }"#;
        let line: RemoteCartLine = serde_json::from_str(json).unwrap();
        let item = CartItem::from(line);

        assert_eq!(item.id, ProductId::new("p1"));
        assert_eq!(item.image_url, "milk.png");
        assert_eq!(item.base_price, Decimal::new(55, 0));
        assert_eq!(item.quantity.get(), 2);
    }

    #[test]
    fn test_remote_cart_line_clamps_quantity() {
        let json = r#"{"product": {"id": "p1", "name": "Eggs", "price": 7.5}, "quantity": 140}"#;
        let line: RemoteCartLine = serde_json::from_str(json).unwrap();
        let item = CartItem::from(line);
        assert_eq!(item.quantity, Quantity::MAX);
        assert_eq!(item.base_price, Decimal::new(75, 1));
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ApiEnvelope<RemoteCart> = serde_json::from_str("{}").unwrap();
        assert!(envelope.success);
        assert!(envelope.data.is_none());

        let envelope: ApiEnvelope<RemoteCart> =
            serde_json::from_str(r#"{"success": false, "message": "Out of stock"}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Out of stock"));
    }

    #[test]
    fn test_remote_cart_with_coupon() {
        let json = r#"{
            "items": [],
            "currentPrice": 90,
            "originalPrice": 130,
            "appliedCoupon": {"id": "c1", "code": "SAVE40", "discount": 40}
        }"#;
        let cart: RemoteCart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.current_price, Some(Decimal::new(90, 0)));
        assert_eq!(cart.applied_coupon.unwrap().code, "SAVE40");
    }

    #[test]
    fn test_checkout_request_skips_missing_coupon() {
        let request = CheckoutRequest {
            address_id: AddressId::new("a1"),
            payment_method_id: PaymentMethodId::new("pm1"),
            coupon_code: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["addressId"], "a1");
        assert_eq!(json["paymentMethodId"], "pm1");
        assert!(json.get("couponCode").is_none());
    }

    #[test]
    fn test_add_request_shape() {
        let id = ProductId::new("p9");
        let request = AddToCartRequest {
            product_id: &id,
            quantity: 3,
            variant_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"productId": "p9", "quantity": 3}));
    }

    #[test]
    fn test_placed_order_aliases() {
        let json = r#"{"_id": "o1", "status": "confirmed", "totalPrice": 130}"#;
        let order: PlacedOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, OrderId::new("o1"));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.total_amount, Decimal::new(130, 0));
    }
}
