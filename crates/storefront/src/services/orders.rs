//! Order queries and staff lifecycle actions.

use tracing::instrument;

use smartstore_core::order::{LifecycleAction, LifecycleOutcome, OrderDetail};
use smartstore_core::session::CurrentStaff;
use smartstore_core::store::{CommerceStore, OrderStore, StoreError};
use smartstore_core::{CustomerId, OrderId, OrderStatus};

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// Run a lifecycle action on behalf of a staff member.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order, `Transition` for a forbidden move.
    #[instrument(skip(self, staff), fields(order_id = %id, staff_id = %staff.id))]
    pub async fn apply(
        &self,
        id: OrderId,
        action: LifecycleAction,
        staff: &CurrentStaff,
    ) -> Result<LifecycleOutcome, StoreError> {
        let outcome = self.store.apply_lifecycle(id, action, staff.id).await?;
        if outcome.applied {
            tracing::info!(status = %outcome.order.status, "Order status changed");
        } else {
            tracing::debug!(status = %outcome.order.status, "Lifecycle action was a no-op");
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown order.
    pub async fn get(&self, id: OrderId) -> Result<OrderDetail, StoreError> {
        self.store
            .get_order(id)
            .await?
            .ok_or(StoreError::NotFound("order"))
    }

    /// An order, only if it belongs to `customer`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order or one placed by someone else.
    pub async fn get_for_customer(
        &self,
        id: OrderId,
        customer: CustomerId,
    ) -> Result<OrderDetail, StoreError> {
        match self.store.get_order(id).await? {
            Some(detail) if detail.order.customer_id == customer => Ok(detail),
            _ => Err(StoreError::NotFound("order")),
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn all(&self, status: Option<OrderStatus>) -> Result<Vec<OrderDetail>, StoreError> {
        self.store.list_orders(status).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn for_customer(
        &self,
        customer: CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        self.store.customer_orders(customer, status).await
    }
}
