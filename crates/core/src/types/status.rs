//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order placed through checkout.
///
/// Maps to the backend's lowercase order status strings. Unknown values
/// deserialize as [`OrderStatus::Unknown`] so a new backend status never
/// breaks order tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Packed,
    OutForDelivery,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order can still change state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Packed => "packed",
            Self::OutForDelivery => "out for delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
