//! Guest cart migration on login.

use tracing::{info, instrument, warn};

use saverush_core::ProductId;

use super::error::CartError;
use super::guest::GuestCartStorage;
use super::store::CartStore;

/// Outcome of a guest cart migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Lines added to the user's cart.
    pub migrated: Vec<ProductId>,
    /// Lines that could not be added, with the failure message.
    pub failed: Vec<(ProductId, String)>,
}

impl MigrationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.failed.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copy every guest line into `target`, then clear the guest cart.
///
/// Each line is added with its full quantity. Lines that fail are logged
/// and skipped; the guest cart is cleared regardless, so migration runs at
/// most once per guest cart.
///
/// # Errors
///
/// Returns an error if the guest cart cannot be read or cleared.
#[instrument(skip_all, fields(guest_key = %guest.key()))]
pub async fn migrate_guest_cart(
    guest: &GuestCartStorage,
    target: &dyn CartStore,
) -> Result<MigrationReport, CartError> {
    let cart = guest.get_cart()?;
    let mut report = MigrationReport::default();

    for item in &cart.items {
        match target.add(item, item.quantity.get()).await {
            Ok(()) => report.migrated.push(item.id.clone()),
            Err(e) => {
                warn!(product_id = %item.id, error = %e, "failed to migrate guest cart line");
                report.failed.push((item.id.clone(), e.to_string()));
            }
        }
    }

    guest.clear_cart()?;

    info!(
        migrated = report.migrated.len(),
        failed = report.failed.len(),
        "guest cart migrated"
    );
    Ok(report)
}
