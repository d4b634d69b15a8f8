//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (fills the span's `request_id`)
//! 4. Session layer (tower-sessions)
//! 5. Rate limiting on login, registration and checkout (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{AuthRejection, RequireCustomer, RequireManager, RequireStaff};
pub use rate_limit::{auth_rate_limiter, checkout_rate_limiter};
pub use request_id::{request_id_middleware, request_span};
pub use session::{create_session_layer, session_layer};
