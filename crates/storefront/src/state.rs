//! Application state shared by front ends.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::StorefrontConfig;
use crate::services::auth::AuthService;
use crate::services::cart::{CartManager, Notifier};
use crate::storage::{FileStorage, KeyValueStore, StorageError};

/// Application state shared across the storefront.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and the client-side store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    storage: Arc<dyn KeyValueStore>,
}

impl AppState {
    /// Create application state backed by the configured state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file's directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StorageError> {
        let storage = Arc::new(FileStorage::open(&config.state_file)?);
        Ok(Self::with_storage(config, storage))
    }

    /// Create application state over an explicit store.
    #[must_use]
    pub fn with_storage(config: StorefrontConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let backend = BackendClient::new(&config.backend);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                storage,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a handle to the client-side store.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.inner.storage)
    }

    /// Build the authentication service.
    #[must_use]
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(Arc::new(self.inner.backend.clone()), self.storage())
    }

    /// Build a cart manager reporting through `notifier`.
    #[must_use]
    pub fn cart_manager(&self, notifier: Arc<dyn Notifier>) -> CartManager {
        CartManager::new(Arc::new(self.inner.backend.clone()), self.storage(), notifier)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}
