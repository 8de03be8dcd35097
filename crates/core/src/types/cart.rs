//! Cart line types.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CouponId, ProductId};

/// Quantity of a single cart line.
///
/// Always within `1..=99`. Out-of-range inputs are clamped rather than
/// rejected; callers that need "zero means remove" semantics check the raw
/// value before constructing a `Quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest quantity a line can hold.
    pub const MIN: Self = Self(1);
    /// Largest quantity a line can hold.
    pub const MAX: Self = Self(99);

    /// Create a quantity, clamping into `1..=99`.
    #[must_use]
    pub const fn clamped(value: u32) -> Self {
        if value < Self::MIN.0 {
            Self::MIN
        } else if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add `n` units, saturating at [`Quantity::MAX`].
    #[must_use]
    pub const fn saturating_add(self, n: u32) -> Self {
        Self::clamped(self.0.saturating_add(n))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

// Stored snapshots may have been written by older clients without clamping.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Ok(Self::clamped(raw))
    }
}

/// A single line in a cart.
///
/// Identity is the product `id`; a cart never holds two lines with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Product image URL.
    #[serde(default)]
    pub image_url: String,
    /// Unit price before any coupon.
    pub base_price: Decimal,
    /// Units of this product in the cart.
    pub quantity: Quantity,
}

impl CartItem {
    /// Create a line with a quantity of one.
    #[must_use]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        image_url: impl Into<String>,
        base_price: Decimal,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: image_url.into(),
            base_price,
            quantity: Quantity::MIN,
        }
    }

    /// Set the quantity, returning the updated line.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    /// Price of this line (`base_price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        super::price::line_total(self.base_price, self.quantity)
    }
}

/// A coupon the server has validated and applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    /// Coupon identifier.
    pub id: CouponId,
    /// Human-facing coupon code.
    pub code: String,
    /// Discount amount granted by the server.
    pub discount: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_clamps_low() {
        assert_eq!(Quantity::clamped(0), Quantity::MIN);
    }

    #[test]
    fn test_quantity_clamps_high() {
        assert_eq!(Quantity::clamped(150).get(), 99);
    }

    #[test]
    fn test_quantity_in_range() {
        assert_eq!(Quantity::clamped(42).get(), 42);
    }

    #[test]
    fn test_quantity_saturating_add() {
        assert_eq!(Quantity::clamped(98).saturating_add(5), Quantity::MAX);
        assert_eq!(Quantity::clamped(3).saturating_add(1).get(), 4);
    }

    #[test]
    fn test_quantity_deserialize_clamps() {
        let q: Quantity = serde_json::from_str("250").unwrap();
        assert_eq!(q, Quantity::MAX);
    }

    #[test]
    fn test_cart_item_camel_case() {
        let item = CartItem::new(
            ProductId::new("p1"),
            "Milk",
            "https://img/milk.png",
            Decimal::new(5000, 2),
        )
        .with_quantity(Quantity::clamped(2));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["imageUrl"], "https://img/milk.png");
        assert_eq!(json["quantity"], 2);
        assert!(json.get("basePrice").is_some());
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new(ProductId::new("p1"), "Rice", "", Decimal::new(50, 0))
            .with_quantity(Quantity::clamped(3));
        assert_eq!(item.line_total(), Decimal::new(150, 0));
    }
}
