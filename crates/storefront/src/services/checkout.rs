//! Turning a session cart into an order.

use thiserror::Error;
use tracing::instrument;

use smartstore_core::order::{NewOrder, OrderDetail, ShippingError, ShippingInfo};
use smartstore_core::session::{AccessError, SessionContext};
use smartstore_core::store::{CommerceStore, OrderStore, StoreError};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// Place an order for the signed-in customer from their cart.
    ///
    /// An empty cart places nothing and returns `Ok(None)`. On success the
    /// cart is emptied; on any failure it is left as it was.
    ///
    /// # Errors
    ///
    /// `Access` without a customer session, `Shipping` for a blank address,
    /// `Store` if the order cannot be written (nothing is persisted then).
    /// A `Store` error wrapping [`StoreError::Limit`] means the quantities or
    /// totals are too large to store.
    #[instrument(skip(self, session, shipping))]
    pub async fn checkout(
        &self,
        session: &mut SessionContext,
        shipping: ShippingInfo,
    ) -> Result<Option<OrderDetail>, CheckoutError> {
        let customer_id = session.require_customer()?.id;
        if session.cart.is_empty() {
            return Ok(None);
        }
        let shipping = shipping.validate()?;

        let order = NewOrder::from_cart(customer_id, shipping, &session.cart);
        let placed = self.store.place_order(&order).await?;
        session.cart.clear();

        tracing::info!(
            order_id = %placed.order.id,
            customer_id = %customer_id,
            total = %placed.order.total,
            "Order placed"
        );
        Ok(Some(placed))
    }
}
