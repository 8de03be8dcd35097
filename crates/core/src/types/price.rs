//! Price arithmetic using decimal amounts.
//!
//! All amounts are in the store currency's standard unit (rupees, not paise).

use rust_decimal::Decimal;

use super::cart::{CartItem, Quantity};

/// Price of `quantity` units at `unit_price`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: Quantity) -> Decimal {
    unit_price * Decimal::from(quantity.get())
}

/// Sum of `base_price * quantity` over every line.
#[must_use]
pub fn subtotal<'a>(items: impl IntoIterator<Item = &'a CartItem>) -> Decimal {
    items.into_iter().map(CartItem::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProductId;

    #[test]
    fn test_subtotal_empty() {
        assert_eq!(subtotal(&Vec::<CartItem>::new()), Decimal::ZERO);
    }

    #[test]
    fn test_subtotal_mixed_lines() {
        let items = [
            CartItem::new(ProductId::new("a"), "A", "", Decimal::new(50, 0))
                .with_quantity(Quantity::clamped(2)),
            CartItem::new(ProductId::new("b"), "B", "", Decimal::new(30, 0)),
        ];
        assert_eq!(subtotal(&items), Decimal::new(130, 0));
    }

    #[test]
    fn test_line_total_fractional() {
        let total = line_total(Decimal::new(1999, 2), Quantity::clamped(3));
        assert_eq!(total, Decimal::new(5997, 2));
    }
}
