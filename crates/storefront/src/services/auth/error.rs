//! Authentication error types.

use thiserror::Error;

use smartstore_core::account::AccountInputError;
use smartstore_core::store::StoreError;

/// Errors that can occur during authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Form input failed validation.
    #[error(transparent)]
    Input(#[from] AccountInputError),

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Map a store `Conflict` (duplicate email) to [`AuthError::EmailTaken`].
    #[must_use]
    pub fn from_account_write(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::EmailTaken,
            other => Self::Store(other),
        }
    }
}
