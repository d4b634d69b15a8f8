//! Application state shared across handlers.

use std::sync::Arc;

use smartstore_core::store::CommerceStore;

use crate::config::StorefrontConfig;
use crate::services::accounts::AccountService;
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::services::catalog::{CatalogService, CategoryCache};
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out request-scoped
/// services over the shared store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn CommerceStore>,
    categories: CategoryCache,
}

impl AppState {
    /// Create a new application state over any store backend.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn CommerceStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                categories: CategoryCache::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn CommerceStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store(), &self.inner.categories)
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        CartService::new(self.store())
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store())
    }

    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.store())
    }
}
