//! SaveRush Core - Shared domain types.
//!
//! This crate provides the types shared by every SaveRush component:
//! - `storefront` - Cart, session and backend client library
//! - `cli` - Terminal storefront built on the library
//!
//! # Architecture
//!
//! The core crate contains only types and invariants - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, cart lines, phone numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
