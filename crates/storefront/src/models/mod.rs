//! Domain models for the storefront session.

pub mod session;

pub use session::{
    AuthenticatedUser, BearerToken, GuestSession, GuestToken, Session, SessionKey, SessionKind,
    keys,
};
