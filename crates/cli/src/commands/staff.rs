//! Staff account commands.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the first manager
//! ss-cli staff create -e lan@smartstore.vn -n "Lan" -r Manager --password '...'
//! ```
//!
//! The role is created if it does not exist yet.

use smartstore_core::account::{ContactDetails, required_password};
use smartstore_core::store::{AccountStore, PgStore};
use smartstore_storefront::services::auth::{AuthError, hash_password};

use super::{CliError, connect};

/// Create a staff member and return their id.
///
/// # Errors
///
/// Returns an error for invalid input, a taken email, or a database failure.
pub async fn create(
    email: &str,
    name: &str,
    phone: Option<&str>,
    role: &str,
    password: &str,
) -> Result<i32, CliError> {
    let contact = ContactDetails::parse(name, phone, email).map_err(AuthError::from)?;
    let password = required_password(password).map_err(AuthError::from)?;
    let hash = hash_password(password)?;

    let store = PgStore::new(connect().await?);
    let role = store.ensure_role(role.trim()).await?;

    tracing::info!("Creating staff member: {} ({})", contact.email, role.name);
    let staff = store
        .create_staff(&contact, role.id, &hash)
        .await
        .map_err(AuthError::from_account_write)?;

    tracing::info!(
        "Staff member created successfully! ID: {}, Email: {}, Role: {}",
        staff.id,
        staff.email,
        staff.role.name
    );
    Ok(staff.id.as_i32())
}
