//! Customer administration handlers (manager only).

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::CustomerId;
use smartstore_core::account::{ContactDetails, CustomerOverview};
use smartstore_core::order::OrderDetail;

use crate::error::{AppError, Result};
use crate::middleware::RequireManager;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::routes::{StatusQuery, form_outcome, non_blank};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Customer edit form. The password cannot be changed here.
#[derive(Debug, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub email: String,
}

/// Customers with their order counts.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireManager(_): RequireManager,
) -> Result<Json<View<Vec<CustomerOverview>>>> {
    let customers = state.accounts().customers().await?;
    Ok(Json(View::new(customers, take_flash(&session).await)))
}

/// One customer with their order count.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireManager(_): RequireManager,
    Path(id): Path<CustomerId>,
) -> Result<Json<View<CustomerOverview>>> {
    let customer = state.accounts().customer(id).await?;
    Ok(Json(View::new(customer, take_flash(&session).await)))
}

/// Edit a customer's contact details.
#[instrument(skip(state, session, manager, form), fields(staff_id = %manager.id, customer_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireManager(manager): RequireManager,
    Path(id): Path<CustomerId>,
    Form(form): Form<CustomerForm>,
) -> Result<Redirect> {
    let outcome = async {
        let contact = ContactDetails::parse(&form.name, non_blank(form.phone.as_deref()), &form.email)
            .map_err(AuthError::from)?;
        let customer = state.accounts().update_customer(id, &contact).await?;
        Ok::<_, AppError>(format!("Customer {} saved", customer.name))
    }
    .await;
    form_outcome(&session, &format!("/admin/customers/{id}"), outcome).await
}

/// A customer's orders, optionally by status.
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireManager(_): RequireManager,
    Path(id): Path<CustomerId>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<View<Vec<OrderDetail>>>> {
    let orders = state
        .accounts()
        .customer_orders(id, query.status())
        .await?;
    Ok(Json(View::new(orders, take_flash(&session).await)))
}

/// Delete a customer. Refused while they have orders.
#[instrument(skip(state, session, manager), fields(staff_id = %manager.id, customer_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireManager(manager): RequireManager,
    Path(id): Path<CustomerId>,
) -> Result<Redirect> {
    let outcome = state
        .accounts()
        .delete_customer(id)
        .await
        .map(|()| "Customer deleted".to_string())
        .map_err(Into::into);
    form_outcome(&session, "/admin/customers", outcome).await
}
