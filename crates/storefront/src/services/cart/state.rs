//! In-memory cart state.

use rust_decimal::Decimal;

use saverush_core::{AppliedCoupon, CartItem, ProductId, Quantity, subtotal};

/// Server-validated prices that override the local sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPricing {
    /// Price after discount.
    pub current_price: Decimal,
    /// Price before discount.
    pub original_price: Decimal,
}

/// The cart as the shopper currently sees it.
///
/// Line order is insertion order. `total_price` is the sum of line totals
/// unless the server supplied a discounted price, which then wins. Item
/// mutations never touch the coupon or the server pricing; only coupon
/// responses and reloads do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartItem>,
    pricing: Option<ServerPricing>,
    applied_coupon: Option<AppliedCoupon>,
}

impl CartState {
    /// Build state from a loaded snapshot.
    #[must_use]
    pub const fn new(
        items: Vec<CartItem>,
        pricing: Option<ServerPricing>,
        applied_coupon: Option<AppliedCoupon>,
    ) -> Self {
        Self {
            items,
            pricing,
            applied_coupon,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity.get()).sum()
    }

    /// Sum of line totals, ignoring any coupon.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal(&self.items)
    }

    /// Price the shopper pays.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.pricing
            .map_or_else(|| self.subtotal(), |pricing| pricing.current_price)
    }

    /// Discounted price from the server, if a coupon response set one.
    #[must_use]
    pub fn discounted_price(&self) -> Option<Decimal> {
        self.pricing.map(|pricing| pricing.current_price)
    }

    /// Pre-discount price from the server, if a coupon response set one.
    #[must_use]
    pub fn original_price(&self) -> Option<Decimal> {
        self.pricing.map(|pricing| pricing.original_price)
    }

    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.applied_coupon.as_ref()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add one unit of `item`, appending a new line if needed.
    ///
    /// Returns the resulting quantity of the line.
    pub fn add(&mut self, item: CartItem) -> Quantity {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == item.id) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        let item = item.with_quantity(Quantity::MIN);
        let quantity = item.quantity;
        self.items.push(item);
        quantity
    }

    /// Set the quantity of an existing line. Returns `false` if absent.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: Quantity) -> bool {
        match self.items.iter_mut().find(|line| &line.id == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line, returning it if present.
    pub fn remove(&mut self, id: &ProductId) -> Option<CartItem> {
        let index = self.items.iter().position(|line| &line.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Overwrite server pricing and coupon from a coupon response.
    ///
    /// Without a coupon there is no discount to override the local sum, so
    /// the server prices are dropped.
    pub fn apply_pricing(&mut self, pricing: ServerPricing, applied_coupon: Option<AppliedCoupon>) {
        self.pricing = applied_coupon.as_ref().map(|_| pricing);
        self.applied_coupon = applied_coupon;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use saverush_core::CouponId;

    use super::*;

    fn item(id: &str, price: i64) -> CartItem {
        CartItem::new(ProductId::new(id), id, "", Decimal::new(price, 0))
    }

    #[test]
    fn test_add_distinct_items() {
        let mut state = CartState::default();
        state.add(item("a", 50));
        state.add(item("b", 30));
        state.add(item("a", 50));

        assert_eq!(state.items().len(), 2);
        assert_eq!(state.total_items(), 3);
        assert_eq!(state.total_price(), Decimal::new(130, 0));
    }

    #[test]
    fn test_add_ignores_incoming_quantity() {
        let mut state = CartState::default();
        let quantity = state.add(item("a", 50).with_quantity(Quantity::clamped(7)));
        assert_eq!(quantity, Quantity::MIN);
    }

    #[test]
    fn test_add_saturates_at_max() {
        let mut state = CartState::default();
        state.add(item("a", 1));
        state.set_quantity(&ProductId::new("a"), Quantity::MAX);
        assert_eq!(state.add(item("a", 1)), Quantity::MAX);
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let mut state = CartState::default();
        assert!(!state.set_quantity(&ProductId::new("x"), Quantity::clamped(2)));
    }

    #[test]
    fn test_server_pricing_overrides_sum() {
        let mut state = CartState::default();
        state.add(item("a", 100));
        assert_eq!(state.discounted_price(), None);

        state.apply_pricing(
            ServerPricing {
                current_price: Decimal::new(80, 0),
                original_price: Decimal::new(100, 0),
            },
            Some(AppliedCoupon {
                id: CouponId::new("c1"),
                code: "SAVE20".to_string(),
                discount: Decimal::new(20, 0),
            }),
        );

        assert_eq!(state.total_price(), Decimal::new(80, 0));
        assert_eq!(state.subtotal(), Decimal::new(100, 0));
        assert_eq!(state.original_price(), Some(Decimal::new(100, 0)));
    }

    #[test]
    fn test_pricing_without_coupon_uses_local_sum() {
        let mut state = CartState::default();
        state.add(item("a", 100));
        state.apply_pricing(
            ServerPricing {
                current_price: Decimal::new(100, 0),
                original_price: Decimal::new(100, 0),
            },
            None,
        );
        state.add(item("a", 100));

        assert_eq!(state.discounted_price(), None);
        assert_eq!(state.total_price(), Decimal::new(200, 0));
    }

    #[test]
    fn test_item_mutations_keep_coupon() {
        let coupon = AppliedCoupon {
            id: CouponId::new("c1"),
            code: "SAVE20".to_string(),
            discount: Decimal::new(20, 0),
        };
        let mut state = CartState::new(vec![item("a", 100)], None, Some(coupon.clone()));

        state.remove(&ProductId::new("a"));
        assert!(state.is_empty());
        assert_eq!(state.applied_coupon(), Some(&coupon));

        state.clear_items();
        assert_eq!(state.applied_coupon(), Some(&coupon));
    }
}
