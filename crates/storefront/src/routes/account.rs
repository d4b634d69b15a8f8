//! Customer account route handlers.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::account::Customer;
use smartstore_core::order::OrderDetail;
use smartstore_core::session::CurrentCustomer;
use smartstore_core::store::{AccountStore, StoreError};
use smartstore_core::OrderId;

use super::{StatusQuery, form_outcome, non_blank};
use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::middleware::session::{load_context, save_context, take_flash};
use crate::models::View;
use crate::services::auth::ProfileUpdate;
use crate::state::AppState;

/// Profile form data. A blank new password keeps the current one.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub email: String,
    pub new_password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Display the signed-in customer's profile.
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(current): RequireCustomer,
) -> Result<Json<View<Customer>>> {
    let customer = state
        .store()
        .get_customer(current.id)
        .await?
        .ok_or(StoreError::NotFound("customer"))?;

    Ok(Json(View::new(customer, take_flash(&session).await)))
}

/// Update the profile and refresh the session's customer claim.
#[instrument(skip(state, session, current, form), fields(customer_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(current): RequireCustomer,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let update = ProfileUpdate {
        name: &form.name,
        phone: non_blank(form.phone.as_deref()),
        email: &form.email,
        new_password: form.new_password.as_deref(),
        password_confirm: form.password_confirm.as_deref(),
    };

    let outcome = match state.auth().update_profile(current.id, update).await {
        Ok(customer) => {
            let mut ctx = load_context(&session).await?;
            ctx.customer = Some(CurrentCustomer::from(&customer));
            save_context(&session, &ctx).await?;
            Ok("Profile updated".to_string())
        }
        Err(err) => Err(err.into()),
    };
    form_outcome(&session, "/account/profile", outcome).await
}

/// The customer's order history, optionally filtered by status.
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(current): RequireCustomer,
    Query(query): Query<StatusQuery>,
) -> Result<Json<View<Vec<OrderDetail>>>> {
    let orders = state
        .orders()
        .for_customer(current.id, query.status())
        .await?;
    Ok(Json(View::new(orders, take_flash(&session).await)))
}

/// One of the customer's own orders.
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(current): RequireCustomer,
    Path(id): Path<OrderId>,
) -> Result<Json<View<OrderDetail>>> {
    let order = state.orders().get_for_customer(id, current.id).await?;
    Ok(Json(View::new(order, take_flash(&session).await)))
}
