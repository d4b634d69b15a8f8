//! Session middleware configuration and typed session access.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions, and moves the
//! [`SessionContext`] and flash messages in and out of a [`Session`].

use sqlx::PgPool;
use tower_sessions::session::Error as SessionError;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use smartstore_core::cart::Cart;
use smartstore_core::session::{CurrentCustomer, CurrentStaff, SessionContext, keys};

use crate::config::StorefrontConfig;
use crate::models::Flash;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ss_session";

/// Idle time after which a session expires.
const SESSION_IDLE_MINUTES: i64 = 30;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions` schema is created by `ss-cli migrate`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    session_layer(PostgresStore::new(pool.clone()), config.is_secure())
}

/// Session layer over any store, with the storefront's cookie settings.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::minutes(SESSION_IDLE_MINUTES),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

// =============================================================================
// Session Context
// =============================================================================

/// Read the visitor's identities and cart.
///
/// # Errors
///
/// Returns an error if the session store fails or a value cannot be decoded.
pub async fn load_context(session: &Session) -> Result<SessionContext, SessionError> {
    Ok(SessionContext {
        customer: session.get::<CurrentCustomer>(keys::CURRENT_CUSTOMER).await?,
        staff: session.get::<CurrentStaff>(keys::CURRENT_STAFF).await?,
        cart: load_cart(session).await?,
    })
}

/// Write the context back, removing empty identity slots.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_context(session: &Session, ctx: &SessionContext) -> Result<(), SessionError> {
    match &ctx.customer {
        Some(customer) => session.insert(keys::CURRENT_CUSTOMER, customer).await?,
        None => {
            session.remove_value(keys::CURRENT_CUSTOMER).await?;
        }
    }
    match &ctx.staff {
        Some(staff) => session.insert(keys::CURRENT_STAFF, staff).await?,
        None => {
            session.remove_value(keys::CURRENT_STAFF).await?;
        }
    }
    save_cart(session, &ctx.cart).await
}

/// Read the cart, empty if none was stored.
///
/// # Errors
///
/// Returns an error if the session store fails or the cart cannot be decoded.
pub async fn load_cart(session: &Session) -> Result<Cart, SessionError> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), SessionError> {
    session.insert(keys::CART, cart).await
}

// =============================================================================
// Flash Messages
// =============================================================================

/// Store a message for the next view.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_flash(session: &Session, flash: Flash) -> Result<(), SessionError> {
    session.insert(keys::FLASH, flash).await
}

/// Remove and return the pending message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(keys::FLASH).await.ok().flatten()
}
