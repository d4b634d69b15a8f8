//! Authentication route handlers.
//!
//! One login form serves both staff and customers. Registration creates a
//! customer and signs them in. Logout drops both identities but keeps the
//! cart.

use axum::{Form, Json, extract::State, response::Redirect};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::session::{CurrentCustomer, CurrentStaff};

use super::{form_outcome, non_blank};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::session::{load_context, save_context, take_flash};
use crate::models::View;
use crate::services::auth::{Identity, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub password_confirm: Option<String>,
}

/// Who is signed in, for the login and register views.
#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub customer: Option<String>,
    pub staff: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn auth_page(session: &Session) -> Result<Json<View<AuthPage>>> {
    let ctx = load_context(session).await?;
    Ok(Json(View::new(
        AuthPage {
            customer: ctx.customer.map(|c| c.name),
            staff: ctx.staff.map(|s| s.name),
        },
        take_flash(session).await,
    )))
}

/// Display the login view.
pub async fn login_page(session: Session) -> Result<Json<View<AuthPage>>> {
    auth_page(&session).await
}

/// Display the registration view.
pub async fn register_page(session: Session) -> Result<Json<View<AuthPage>>> {
    auth_page(&session).await
}

/// Handle login form submission.
///
/// Staff land on the back-office order list, customers on the home page.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let identity = match state.auth().login(&form.email, &form.password).await {
        Ok(identity) => identity,
        Err(err) => return form_outcome(&session, "/auth/login", Err(err.into())).await,
    };

    session.cycle_id().await?;
    let mut ctx = load_context(&session).await?;
    let (to, name) = match identity {
        Identity::Staff(staff) => {
            set_sentry_user(&staff.id, staff.email.as_str());
            let current = CurrentStaff::from(&staff);
            let name = current.name.clone();
            ctx.login_staff(current);
            ("/admin/orders", name)
        }
        Identity::Customer(customer) => {
            set_sentry_user(&customer.id, customer.email.as_str());
            let current = CurrentCustomer::from(&customer);
            let name = current.name.clone();
            ctx.login_customer(current);
            ("/", name)
        }
    };
    save_context(&session, &ctx).await?;

    form_outcome(&session, to, Ok(format!("Welcome back, {name}"))).await
}

/// Handle registration form submission.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    let registration = Registration {
        name: &form.name,
        phone: non_blank(form.phone.as_deref()),
        email: &form.email,
        password: &form.password,
        password_confirm: form.password_confirm.as_deref(),
    };

    let customer = match state.auth().register(registration).await {
        Ok(customer) => customer,
        Err(err) => return form_outcome(&session, "/auth/register", Err(err.into())).await,
    };

    session.cycle_id().await?;
    let mut ctx = load_context(&session).await?;
    ctx.login_customer(CurrentCustomer::from(&customer));
    save_context(&session, &ctx).await?;
    set_sentry_user(&customer.id, customer.email.as_str());

    form_outcome(&session, "/", Ok(format!("Welcome, {}", customer.name))).await
}

/// Handle logout. The cart stays in the session.
pub async fn logout(session: Session) -> Result<Redirect> {
    let mut ctx = load_context(&session).await?;
    ctx.logout();
    save_context(&session, &ctx).await?;
    clear_sentry_user();

    form_outcome(&session, "/", Ok("Signed out".to_string())).await
}
