//! Back-office account management (manager only).

use tracing::instrument;

use smartstore_core::account::{
    ContactDetails, Customer, CustomerOverview, Role, Staff, password_change, required_password,
};
use smartstore_core::order::OrderDetail;
use smartstore_core::store::{AccountStore, CommerceStore, OrderStore, StoreError};
use smartstore_core::{CustomerId, OrderStatus, RoleId, StaffId};

use super::auth::{AuthError, hash_password};

/// Raw staff form input.
#[derive(Debug, Clone, Copy)]
pub struct StaffForm<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub email: &'a str,
    pub role_id: RoleId,
    /// Required on create; blank on update keeps the current password.
    pub password: Option<&'a str>,
}

/// Staff and customer administration.
pub struct AccountService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn staff(&self) -> Result<Vec<Staff>, StoreError> {
        self.store.list_staff().await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn roles(&self) -> Result<Vec<Role>, StoreError> {
        self.store.list_roles().await
    }

    /// # Errors
    ///
    /// `AuthError::Input` for a blank name, bad email or missing password,
    /// `AuthError::EmailTaken` for a duplicate email.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn create_staff(&self, form: StaffForm<'_>) -> Result<Staff, AuthError> {
        let contact = ContactDetails::parse(form.name, form.phone, form.email)?;
        let password = required_password(form.password.unwrap_or_default())?;
        let hash = hash_password(password)?;

        let staff = self
            .store
            .create_staff(&contact, form.role_id, &hash)
            .await
            .map_err(AuthError::from_account_write)?;
        tracing::info!(staff_id = %staff.id, role = %staff.role.name, "Staff created");
        Ok(staff)
    }

    /// # Errors
    ///
    /// As [`AccountService::create_staff`], plus `NotFound` for an unknown
    /// staff member or role.
    #[instrument(skip(self, form), fields(staff_id = %id))]
    pub async fn update_staff(&self, id: StaffId, form: StaffForm<'_>) -> Result<Staff, AuthError> {
        let contact = ContactDetails::parse(form.name, form.phone, form.email)?;
        let hash = password_change(form.password, None)?
            .map(hash_password)
            .transpose()?;

        self.store
            .update_staff(id, &contact, form.role_id, hash.as_deref())
            .await
            .map_err(AuthError::from_account_write)
    }

    /// # Errors
    ///
    /// `Conflict` if the staff member approved any order.
    #[instrument(skip(self), fields(staff_id = %id))]
    pub async fn delete_staff(&self, id: StaffId) -> Result<(), StoreError> {
        self.store.delete_staff(id).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn customers(&self) -> Result<Vec<CustomerOverview>, StoreError> {
        self.store.list_customers().await
    }

    /// A customer with their order count.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown customer.
    pub async fn customer(&self, id: CustomerId) -> Result<CustomerOverview, StoreError> {
        let customer = self
            .store
            .get_customer(id)
            .await?
            .ok_or(StoreError::NotFound("customer"))?;
        let orders = self.store.customer_orders(id, None).await?;
        Ok(CustomerOverview {
            customer,
            order_count: i64::try_from(orders.len()).unwrap_or(i64::MAX),
        })
    }

    /// Edit a customer's contact details. The password is left alone.
    ///
    /// # Errors
    ///
    /// `AuthError::Input` for invalid fields, `AuthError::EmailTaken` for a
    /// duplicate email.
    #[instrument(skip(self, contact), fields(customer_id = %id))]
    pub async fn update_customer(
        &self,
        id: CustomerId,
        contact: &ContactDetails,
    ) -> Result<Customer, AuthError> {
        self.store
            .update_customer(id, contact, None)
            .await
            .map_err(AuthError::from_account_write)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown customer.
    pub async fn customer_orders(
        &self,
        id: CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        if self.store.get_customer(id).await?.is_none() {
            return Err(StoreError::NotFound("customer"));
        }
        self.store.customer_orders(id, status).await
    }

    /// # Errors
    ///
    /// `Conflict` if the customer has orders.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        self.store.delete_customer(id).await
    }
}
