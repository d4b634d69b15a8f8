//! HTTP route handlers for the storefront.
//!
//! GET handlers answer with a JSON [`View`](crate::models::View) carrying any
//! pending flash message. Form posts answer `303 See Other` and leave the
//! outcome in a flash message; only server errors surface as error responses.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness
//! GET  /health/ready            - Readiness (store ping)
//!
//! # Catalog
//! GET  /products                - Filtered, sorted, paginated listing
//! GET  /products/{id}           - Product detail
//! GET  /categories              - Category list (cached)
//!
//! # Cart
//! GET  /cart                    - Cart with totals
//! POST /cart/add                - Add product with color/variant
//! POST /cart/update             - Set quantity of a product's line
//! POST /cart/remove             - Remove a product's line
//! POST /cart/clear              - Empty the cart
//! GET  /cart/count              - Badge count
//! POST /cart/buy-now/{id}       - Add one unit and go to checkout
//!
//! # Checkout (customer)
//! GET  /checkout                - Cart plus shipping defaults
//! POST /checkout                - Place the order
//!
//! # Auth
//! GET  /auth/login              - Login view
//! POST /auth/login              - Staff or customer login
//! GET  /auth/register           - Register view
//! POST /auth/register           - Customer registration
//! POST /auth/logout             - Logout (keeps the cart)
//!
//! # Account (customer)
//! GET  /account/profile         - Profile
//! POST /account/profile         - Update profile
//! GET  /account/orders          - Order history (?status=)
//! GET  /account/orders/{id}     - Order detail
//!
//! # Back-office (staff)
//! /admin/...                    - See `admin`
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{Session, SessionManagerLayer, SessionStore};

use smartstore_core::OrderStatus;

use crate::error::AppError;
use crate::middleware::session::set_flash;
use crate::middleware::{
    auth_rate_limiter, checkout_rate_limiter, request_id_middleware, request_span,
};
use crate::models::Flash;
use crate::state::AppState;

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/buy-now/{id}", post(cart::buy_now))
}

/// Create the auth routes router. Login and registration posts are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(limiter.clone())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(limiter)),
        )
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(account::profile).post(account::update_profile))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes())
        .route(
            "/checkout",
            get(checkout::show).merge(post(checkout::submit).layer(checkout_rate_limiter())),
        )
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin::routes())
}

/// The complete application: routes, sessions, request ids and tracing.
///
/// Sentry layers are added by the binary on top of this.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(sessions)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

// =============================================================================
// Form Helpers
// =============================================================================

/// Finish a form post: flash the outcome and redirect.
///
/// Client errors become an error flash; server errors propagate.
pub(crate) async fn form_outcome(
    session: &Session,
    to: &str,
    outcome: Result<String, AppError>,
) -> Result<Redirect, AppError> {
    let flash = match outcome {
        Ok(message) => Flash::success(message),
        Err(err) if err.is_client_error() => {
            tracing::info!(error = %err, "Form rejected");
            Flash::error(err.public_message())
        }
        Err(err) => return Err(err),
    };
    set_flash(session, flash).await?;
    Ok(Redirect::to(to))
}

/// `?status=` filter for order lists, by numeric code or name.
///
/// Unknown values list everything.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    #[must_use]
    pub fn status(&self) -> Option<OrderStatus> {
        let raw = non_blank(self.status.as_deref())?;
        match raw.parse::<i16>() {
            Ok(code) => OrderStatus::from_code(code),
            Err(_) => raw.to_ascii_lowercase().parse().ok(),
        }
    }
}

/// Trimmed, non-empty form text.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional query value, ignoring blanks and malformed input.
pub(crate) fn parse_lenient<T: FromStr>(value: Option<&str>) -> Option<T> {
    non_blank(value).and_then(|v| v.parse().ok())
}

/// Parse an optional form field, rejecting malformed input.
pub(crate) fn parse_field<T: FromStr>(field: &str, value: Option<&str>) -> Result<Option<T>, AppError> {
    non_blank(value)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::BadRequest(format!("invalid {field}")))
        })
        .transpose()
}
