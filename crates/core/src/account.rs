//! Customer and staff accounts.
//!
//! Password hashes are opaque PHC strings here; hashing and verification
//! happen in the storefront's auth service.

use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, Email, EmailError, RoleId, StaffId, StaffTier};

/// A staff role (job title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    #[must_use]
    pub fn tier(&self) -> StaffTier {
        StaffTier::for_role(&self.name)
    }
}

/// A shopper account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// A back-office account with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

/// Customer with the number of orders they placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerOverview {
    pub customer: Customer,
    pub order_count: i64,
}

/// Rejected account input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountInputError {
    #[error("name is required")]
    MissingName,
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("password is required")]
    MissingPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Validated contact details shared by customers and staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub phone: Option<String>,
    pub email: Email,
}

impl ContactDetails {
    /// Trim and validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the email is invalid.
    pub fn parse(name: &str, phone: Option<&str>, email: &str) -> Result<Self, AccountInputError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountInputError::MissingName);
        }
        Ok(Self {
            name: name.to_string(),
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            email: Email::parse(email)?,
        })
    }
}

/// Require a non-blank password, returning it trimmed.
///
/// # Errors
///
/// Returns [`AccountInputError::MissingPassword`] for blank input.
pub fn required_password(password: &str) -> Result<&str, AccountInputError> {
    let password = password.trim();
    if password.is_empty() {
        Err(AccountInputError::MissingPassword)
    } else {
        Ok(password)
    }
}

/// Resolve an optional password change.
///
/// Blank means "keep the current password". A non-blank password must match
/// its confirmation when one is supplied.
///
/// # Errors
///
/// Returns [`AccountInputError::PasswordMismatch`] if the confirmation differs.
pub fn password_change<'a>(
    new_password: Option<&'a str>,
    confirmation: Option<&str>,
) -> Result<Option<&'a str>, AccountInputError> {
    let Some(new_password) = new_password.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if let Some(confirmation) = confirmation
        && confirmation.trim() != new_password
    {
        return Err(AccountInputError::PasswordMismatch);
    }
    Ok(Some(new_password))
}
