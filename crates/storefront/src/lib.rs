//! SaveRush Storefront library.
//!
//! Client-side cart and session reconciliation for the SaveRush grocery
//! storefront. A cart lives either in local key-value storage (guest) or on
//! the backend (authenticated user); [`services::cart::CartManager`] keeps an
//! optimistic local copy in sync with whichever store is active and migrates
//! the guest cart into the user's backend cart on login.
//!
//! # Modules
//!
//! - [`backend`] - REST client for the SaveRush backend
//! - [`storage`] - Key-value persistence (the browser-storage analogue)
//! - [`models`] - Session identity types and storage keys
//! - [`services`] - Auth and cart services
//! - [`config`] - Environment configuration
//! - [`error`] - Unified error type and Sentry helpers
//! - [`state`] - Shared application state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
