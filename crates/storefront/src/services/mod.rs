//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`auth`] - Guest sessions and phone-auth login against the backend
//! - [`cart`] - Cart state container, guest storage and guest-to-user migration

pub mod auth;
pub mod cart;
