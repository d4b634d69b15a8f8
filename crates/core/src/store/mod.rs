//! Persistence boundary.
//!
//! The storefront talks to one `Arc<dyn CommerceStore>`. Two backends exist:
//!
//! - [`memory::MemoryStore`] - every table behind a single async mutex; used
//!   by tests and local demos
//! - `postgres::PgStore` (feature `postgres`) - `PostgreSQL` via sqlx
//!
//! # Concurrency
//!
//! [`OrderStore::place_order`] and [`OrderStore::apply_lifecycle`] are the
//! only multi-row mutations. Each backend applies them atomically: the
//! Postgres store runs them in one transaction (checkout decrements stock
//! with a single clamping `UPDATE`, lifecycle actions lock the order row
//! first), and the memory store holds its lock for the whole operation.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::account::{ContactDetails, Customer, CustomerOverview, Role, Staff};
use crate::catalog::{Category, Page, Product, ProductFilter, ProductInput, ProductSpecs};
use crate::order::{
    LifecycleAction, LifecycleOutcome, NewOrder, OrderDetail, OrderLimitError, TransitionError,
};
use crate::types::{
    CategoryId, CustomerId, Email, OrderId, OrderStatus, ProductId, RoleId, StaffId,
};

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The change would break a constraint (duplicate email, dependents).
    #[error("{0}")]
    Conflict(String),

    /// The lifecycle action is not allowed from the order's status.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The order's quantities or totals do not fit the store.
    #[error(transparent)]
    Limit(#[from] OrderLimitError),
}

/// Products, categories and spec sheets.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    async fn create_category(&self, name: &str) -> Result<Category, StoreError>;

    /// # Errors
    ///
    /// `NotFound` if the category does not exist.
    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category, StoreError>;

    /// # Errors
    ///
    /// `Conflict` while any product belongs to the category.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn product_specs(&self, id: ProductId) -> Result<Option<ProductSpecs>, StoreError>;

    /// Newest products of the same category, excluding the product itself.
    async fn related_products(
        &self,
        product: &Product,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError>;

    /// # Errors
    ///
    /// `NotFound` if the category does not exist.
    async fn create_product(&self, input: &ProductInput) -> Result<Product, StoreError>;

    /// Overwrite editable fields. Purchase count is kept.
    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, StoreError>;

    /// # Errors
    ///
    /// `Conflict` if any order line references the product.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    async fn save_specs(&self, id: ProductId, specs: &ProductSpecs) -> Result<(), StoreError>;
}

/// Customers, staff and roles.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_customer_by_email(&self, email: &Email) -> Result<Option<Customer>, StoreError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// # Errors
    ///
    /// `Conflict` if the email is already registered.
    async fn create_customer(
        &self,
        contact: &ContactDetails,
        password_hash: &str,
    ) -> Result<Customer, StoreError>;

    /// Update contact details; a `Some` hash replaces the password.
    async fn update_customer(
        &self,
        id: CustomerId,
        contact: &ContactDetails,
        password_hash: Option<&str>,
    ) -> Result<Customer, StoreError>;

    async fn list_customers(&self) -> Result<Vec<CustomerOverview>, StoreError>;

    /// # Errors
    ///
    /// `Conflict` if the customer has placed orders.
    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError>;

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Return the role with this name, creating it if needed.
    async fn ensure_role(&self, name: &str) -> Result<Role, StoreError>;

    async fn find_staff_by_email(&self, email: &Email) -> Result<Option<Staff>, StoreError>;

    async fn get_staff(&self, id: StaffId) -> Result<Option<Staff>, StoreError>;

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError>;

    /// # Errors
    ///
    /// `Conflict` on a duplicate email, `NotFound` for an unknown role.
    async fn create_staff(
        &self,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: &str,
    ) -> Result<Staff, StoreError>;

    async fn update_staff(
        &self,
        id: StaffId,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: Option<&str>,
    ) -> Result<Staff, StoreError>;

    /// # Errors
    ///
    /// `Conflict` if the staff member has approved any order.
    async fn delete_staff(&self, id: StaffId) -> Result<(), StoreError>;
}

/// Orders and their lifecycle.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order and apply its stock effects atomically.
    ///
    /// Unit prices are read from the product rows inside the same unit of
    /// work. For every line, stock becomes `max(stock - qty, 0)` and the
    /// purchase count grows by `qty`.
    ///
    /// # Errors
    ///
    /// `NotFound` if a product no longer exists (nothing is written),
    /// `Conflict` if the order has no lines.
    async fn place_order(&self, order: &NewOrder) -> Result<OrderDetail, StoreError>;

    /// Run a lifecycle action.
    ///
    /// `staff` is recorded as the approver when approving. Cancelling
    /// restores stock and reverts purchase counts exactly once.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order, `Transition` when completing a
    /// cancelled order.
    async fn apply_lifecycle(
        &self,
        id: OrderId,
        action: LifecycleAction,
        staff: StaffId,
    ) -> Result<LifecycleOutcome, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, StoreError>;

    /// All orders, newest first.
    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderDetail>, StoreError>;

    /// One customer's orders, newest first.
    async fn customer_orders(
        &self,
        customer: CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, StoreError>;
}

/// The full store used by the storefront.
#[async_trait]
pub trait CommerceStore: CatalogStore + AccountStore + OrderStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
