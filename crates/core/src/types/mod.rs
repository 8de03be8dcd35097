//! Core types for SaveRush.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod phone;
pub mod price;
pub mod status;

pub use cart::{AppliedCoupon, CartItem, Quantity};
pub use id::*;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{line_total, subtotal};
pub use status::OrderStatus;
