//! Authentication extractors.
//!
//! Identities are read from the session populated at login. Customer and
//! staff slots are exclusive, so a staff session never passes
//! [`RequireCustomer`] and vice versa.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use smartstore_core::session::{CurrentCustomer, CurrentStaff, keys};

/// Extractor that requires a signed-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireCustomer(customer): RequireCustomer) -> impl IntoResponse {
///     format!("Orders for {}", customer.email)
/// }
/// ```
pub struct RequireCustomer(pub CurrentCustomer);

/// Extractor that requires a signed-in staff member of any role.
pub struct RequireStaff(pub CurrentStaff);

/// Extractor that requires a signed-in staff member with the manager role.
pub struct RequireManager(pub CurrentStaff);

/// Rejection for the authentication extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not signed in: send to the login page.
    RedirectToLogin,
    /// Signed in without the required role.
    Forbidden,
    /// No session layer is installed.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Manager role required").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn session_value<T: serde::de::DeserializeOwned>(
    parts: &Parts,
    key: &str,
) -> Result<Option<T>, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;
    Ok(session.get::<T>(key).await.ok().flatten())
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_value::<CurrentCustomer>(parts, keys::CURRENT_CUSTOMER)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_value::<CurrentStaff>(parts, keys::CURRENT_STAFF)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl<S> FromRequestParts<S> for RequireManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireStaff(staff) = RequireStaff::from_request_parts(parts, state).await?;
        if staff.is_manager() {
            Ok(Self(staff))
        } else {
            tracing::warn!(staff_id = %staff.id, path = %parts.uri.path(), "Manager route refused");
            Err(AuthRejection::Forbidden)
        }
    }
}
