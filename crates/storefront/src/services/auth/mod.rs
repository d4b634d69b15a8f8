//! Authentication service.
//!
//! Password login for staff and customers, customer registration and the
//! customer's own profile. Passwords are stored as Argon2id PHC strings.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use smartstore_core::account::{
    AccountInputError, ContactDetails, Customer, Staff, password_change, required_password,
};
use smartstore_core::store::{AccountStore, CommerceStore};
use smartstore_core::{CustomerId, Email};

/// Who a successful login resolved to.
#[derive(Debug, Clone)]
pub enum Identity {
    Staff(Staff),
    Customer(Customer),
}

/// Raw registration form input.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: Option<&'a str>,
}

/// Raw profile form input. A blank new password keeps the current one.
#[derive(Debug, Clone, Copy)]
pub struct ProfileUpdate<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub email: &'a str,
    pub new_password: Option<&'a str>,
    pub password_confirm: Option<&'a str>,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// Check credentials, staff accounts first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if neither a staff member nor a
    /// customer matches.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        if let Some(staff) = self.store.find_staff_by_email(&email).await?
            && verify_password(password, &staff.password_hash).is_ok()
        {
            tracing::info!(staff_id = %staff.id, "Staff logged in");
            return Ok(Identity::Staff(staff));
        }

        if let Some(customer) = self.store.find_customer_by_email(&email).await?
            && verify_password(password, &customer.password_hash).is_ok()
        {
            tracing::info!(customer_id = %customer.id, "Customer logged in");
            return Ok(Identity::Customer(customer));
        }

        tracing::warn!("Login failed");
        Err(AuthError::InvalidCredentials)
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Input` for missing or mismatched fields and
    /// `AuthError::EmailTaken` for a registered email.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: Registration<'_>) -> Result<Customer, AuthError> {
        let contact = ContactDetails::parse(form.name, form.phone, form.email)?;
        let password = required_password(form.password)?;
        if let Some(confirm) = form.password_confirm
            && confirm.trim() != password
        {
            return Err(AccountInputError::PasswordMismatch.into());
        }

        let hash = hash_password(password)?;
        let customer = self
            .store
            .create_customer(&contact, &hash)
            .await
            .map_err(AuthError::from_account_write)?;
        tracing::info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Update the signed-in customer's own profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Input` for invalid fields and
    /// `AuthError::EmailTaken` if the new email belongs to someone else.
    #[instrument(skip(self, form), fields(customer_id = %id))]
    pub async fn update_profile(
        &self,
        id: CustomerId,
        form: ProfileUpdate<'_>,
    ) -> Result<Customer, AuthError> {
        let contact = ContactDetails::parse(form.name, form.phone, form.email)?;
        let hash = password_change(form.new_password, form.password_confirm)?
            .map(hash_password)
            .transpose()?;

        self.store
            .update_customer(id, &contact, hash.as_deref())
            .await
            .map_err(AuthError::from_account_write)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use smartstore_core::store::{AccountStore, MemoryStore};

    fn registration<'a>(email: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            name: "Lan",
            phone: Some("0901234567"),
            email,
            password,
            password_confirm: Some(password),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret-pass", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_plaintext_hash() {
        assert!(matches!(
            verify_password("123", "123"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login_customer() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let customer = auth
            .register(registration("Lan@Shop.vn", "matkhau123"))
            .await
            .unwrap();
        assert_eq!(customer.email.as_str(), "lan@shop.vn");

        let identity = auth.login(" lan@shop.vn ", "matkhau123").await.unwrap();
        assert!(matches!(identity, Identity::Customer(c) if c.id == customer.id));

        assert!(matches!(
            auth.login("lan@shop.vn", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("not-an-email", "matkhau123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        auth.register(registration("lan@shop.vn", "a")).await.unwrap();
        let err = auth
            .register(registration("LAN@shop.vn", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_register_password_rules() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let err = auth.register(registration("a@shop.vn", "  ")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Input(AccountInputError::MissingPassword)
        ));

        let mut form = registration("a@shop.vn", "one");
        form.password_confirm = Some("two");
        let err = auth.register(form).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Input(AccountInputError::PasswordMismatch)
        ));
    }

    #[tokio::test]
    async fn test_staff_checked_before_customer() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let role = store.ensure_role("Manager").await.unwrap();
        let contact = ContactDetails::parse("Hà", None, "ha@shop.vn").unwrap();
        store
            .create_staff(&contact, role.id, &hash_password("staffpass").unwrap())
            .await
            .unwrap();
        store
            .create_customer(&contact, &hash_password("custpass").unwrap())
            .await
            .unwrap();

        let staff = auth.login("ha@shop.vn", "staffpass").await.unwrap();
        assert!(matches!(staff, Identity::Staff(s) if s.role.name == "Manager"));

        // Same email, customer password: falls through to the customer table.
        let customer = auth.login("ha@shop.vn", "custpass").await.unwrap();
        assert!(matches!(customer, Identity::Customer(_)));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_password_when_blank() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let customer = auth
            .register(registration("lan@shop.vn", "first"))
            .await
            .unwrap();

        let updated = auth
            .update_profile(
                customer.id,
                ProfileUpdate {
                    name: "Lan Nguyễn",
                    phone: None,
                    email: "lan@shop.vn",
                    new_password: Some(""),
                    password_confirm: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Lan Nguyễn");
        assert!(updated.phone.is_none());
        assert!(auth.login("lan@shop.vn", "first").await.is_ok());

        auth.update_profile(
            customer.id,
            ProfileUpdate {
                name: "Lan",
                phone: None,
                email: "lan@shop.vn",
                new_password: Some("second"),
                password_confirm: Some("second"),
            },
        )
        .await
        .unwrap();
        assert!(auth.login("lan@shop.vn", "first").await.is_err());
        assert!(auth.login("lan@shop.vn", "second").await.is_ok());
    }
}
