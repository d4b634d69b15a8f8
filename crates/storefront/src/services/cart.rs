//! Cart operations that need the catalog.
//!
//! Line-merging rules live on [`smartstore_core::cart::Cart`]; this service
//! resolves product ids to cart views before handing them over. The caller
//! owns the cart and writes it back to the session.

use thiserror::Error;
use tracing::instrument;

use smartstore_core::cart::{self, Cart};
use smartstore_core::catalog::Product;
use smartstore_core::store::{CatalogStore, CommerceStore, StoreError};
use smartstore_core::ProductId;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error(transparent)]
    Rejected(#[from] cart::CartError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A cart line change requested by a form.
#[derive(Debug, Clone)]
pub struct LineSelection {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub variant: Option<String>,
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    async fn product(&self, id: ProductId) -> Result<Product, CartError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CartError::ProductNotFound(id))
    }

    /// Add `quantity` units of the selected product.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` for an unknown product, `Rejected` for a
    /// non-positive quantity or a line that would grow past
    /// [`cart::MAX_LINE_QUANTITY`].
    #[instrument(skip(self, cart), fields(product_id = %selection.product_id))]
    pub async fn add(
        &self,
        cart: &mut Cart,
        selection: LineSelection,
        quantity: i32,
    ) -> Result<(), CartError> {
        let product = self.product(selection.product_id).await?;
        cart.add(
            product.cart_view(),
            selection.color,
            selection.variant,
            quantity,
        )?;
        Ok(())
    }

    /// Add one unit with no selection.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` for an unknown product, `Rejected` if the
    /// product's line is full.
    #[instrument(skip(self, cart), fields(product_id = %id))]
    pub async fn buy_now(&self, cart: &mut Cart, id: ProductId) -> Result<(), CartError> {
        let product = self.product(id).await?;
        cart.buy_now(product.cart_view())?;
        Ok(())
    }
}
