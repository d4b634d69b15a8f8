//! Checkout route handlers.

use axum::{Form, Json, extract::State, response::Redirect};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::order::ShippingInfo;
use smartstore_core::store::AccountStore;

use super::form_outcome;
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::middleware::session::{load_cart, load_context, save_context, take_flash};
use crate::models::{CartView, View};
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_phone: String,
    #[serde(default)]
    pub address: String,
}

/// Checkout page data: the cart plus shipping defaults from the profile.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub cart: CartView,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
}

/// Display the checkout page.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<View<CheckoutView>>> {
    let cart = load_cart(&session).await?;
    let phone = state
        .store()
        .get_customer(customer.id)
        .await?
        .and_then(|c| c.phone);

    Ok(Json(View::new(
        CheckoutView {
            cart: CartView::from(&cart),
            recipient_name: customer.name,
            recipient_phone: phone,
        },
        take_flash(&session).await,
    )))
}

/// Place the order.
#[instrument(skip(state, session, customer, form), fields(customer_id = %customer.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let mut ctx = load_context(&session).await?;
    let shipping = ShippingInfo {
        recipient_name: form.recipient_name,
        recipient_phone: form.recipient_phone,
        address: form.address,
    };

    match state.checkout().checkout(&mut ctx, shipping).await {
        Ok(Some(placed)) => {
            save_context(&session, &ctx).await?;
            let to = format!("/account/orders/{}", placed.order.id);
            form_outcome(
                &session,
                &to,
                Ok(format!("Order #{} placed", placed.order.id)),
            )
            .await
        }
        Ok(None) => {
            form_outcome(
                &session,
                "/cart",
                Err(AppError::BadRequest("Your cart is empty".to_string())),
            )
            .await
        }
        Err(err) => form_outcome(&session, "/checkout", Err(err.into())).await,
    }
}
