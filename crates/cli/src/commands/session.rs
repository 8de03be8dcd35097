//! Login, logout and session commands.

use secrecy::SecretString;

use saverush_storefront::error::{AppError, clear_sentry_user, set_sentry_user};
use saverush_storefront::models::Session;
use saverush_storefront::services::auth::{AuthService, LoginOutcome};
use saverush_storefront::services::cart::{CartManager, SessionSync};

use crate::output;

/// Sign in and move the guest cart to the account.
///
/// A failed backend login leaves the shopper signed out but is not an error.
///
/// # Errors
///
/// Returns an error if session storage fails or the account cart cannot be loaded.
pub async fn login(
    auth: &AuthService,
    cart: &mut CartManager,
    id_token: String,
) -> Result<(), AppError> {
    let outcome = auth.login(&SecretString::from(id_token)).await?;

    let session = match outcome {
        LoginOutcome::Authenticated(session) => session,
        LoginOutcome::Degraded { reason, session } => {
            tracing::warn!(error = %reason, "login degraded");
            output::warning("Sign-in failed; you can keep shopping as a guest.");
            session
        }
    };

    if let Some(user) = session.user() {
        set_sentry_user(&user.id, user.phone.as_ref().map(|p| p.as_str()));
    }

    if let SessionSync::Reloaded {
        migration: Some(report),
    } = cart.sync_session(session).await?
    {
        output::migration(&report);
    }
    output::session(cart);
    output::cart(cart);
    Ok(())
}

/// Sign out and start a fresh guest cart.
///
/// # Errors
///
/// Returns an error if session storage fails.
pub async fn logout(auth: &AuthService, cart: &mut CartManager) -> Result<(), AppError> {
    let guest = auth.logout()?;
    clear_sentry_user();
    cart.sync_session(Session::Guest(guest)).await?;
    output::session(cart);
    Ok(())
}
