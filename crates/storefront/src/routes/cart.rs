//! Cart route handlers.
//!
//! The cart lives in the session under the `cart` key as a JSON array of
//! lines. Every post loads it, applies one change and writes it back.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::ProductId;

use super::{form_outcome, non_blank, parse_field};
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::middleware::session::{load_cart, save_cart, take_flash};
use crate::models::{CartView, View};
use crate::services::cart::{CartError, LineSelection};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    /// Defaults to 1.
    pub quantity: Option<String>,
    pub color: Option<String>,
    pub variant: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: String,
    pub color: Option<String>,
    pub variant: Option<String>,
}

/// Remove from cart form data.
///
/// Without `color` and `variant` the first line of the product goes; with
/// either field present only the line with exactly that selection does.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub variant: Option<String>,
}

/// Cart badge.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: i32,
}

/// Display the cart.
pub async fn show(session: Session) -> Result<Json<View<CartView>>> {
    let cart = load_cart(&session).await?;
    Ok(Json(View::new(
        CartView::from(&cart),
        take_flash(&session).await,
    )))
}

/// Cart count badge.
pub async fn count(session: Session) -> Result<Json<CartCount>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartCount {
        count: cart.count(),
    }))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let outcome = async {
        let quantity = parse_field::<i32>("quantity", form.quantity.as_deref())?.unwrap_or(1);
        let mut cart = load_cart(&session).await?;
        state
            .cart()
            .add(
                &mut cart,
                LineSelection {
                    product_id: form.product_id,
                    color: form.color,
                    variant: form.variant,
                },
                quantity,
            )
            .await?;
        save_cart(&session, &cart).await?;
        Ok::<_, AppError>("Added to cart".to_string())
    }
    .await;

    form_outcome(&session, "/cart", outcome).await
}

/// Set the quantity of a product's line. Zero or less removes it.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Redirect> {
    let outcome = async {
        let quantity = parse_field::<i32>("quantity", Some(&form.quantity))?
            .ok_or_else(|| AppError::BadRequest("quantity is required".to_string()))?;
        let mut cart = load_cart(&session).await?;
        // Blank selection fields keep the line's current color and variant
        let color = non_blank(form.color.as_deref()).map(String::from);
        let variant = non_blank(form.variant.as_deref()).map(String::from);
        let found = cart
            .update_quantity(form.product_id, quantity, color, variant)
            .map_err(CartError::from)?;
        if !found {
            return Err(AppError::NotFound("cart line".to_string()));
        }
        save_cart(&session, &cart).await?;
        Ok::<_, AppError>("Cart updated".to_string())
    }
    .await;

    form_outcome(&session, "/cart", outcome).await
}

/// Remove a product's line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let outcome = async {
        let mut cart = load_cart(&session).await?;
        let removed = if form.color.is_some() || form.variant.is_some() {
            cart.remove_variant(
                form.product_id,
                non_blank(form.color.as_deref()),
                non_blank(form.variant.as_deref()),
            )
        } else {
            cart.remove(form.product_id)
        };
        if !removed {
            return Err(AppError::NotFound("cart line".to_string()));
        }
        save_cart(&session, &cart).await?;
        Ok::<_, AppError>("Removed from cart".to_string())
    }
    .await;

    form_outcome(&session, "/cart", outcome).await
}

/// Empty the cart.
pub async fn clear(session: Session) -> Result<Redirect> {
    let outcome = async {
        let mut cart = load_cart(&session).await?;
        cart.clear();
        save_cart(&session, &cart).await?;
        Ok::<_, AppError>("Cart cleared".to_string())
    }
    .await;

    form_outcome(&session, "/cart", outcome).await
}

/// Add one unit of a product and continue to checkout. Customers only.
#[instrument(skip(state, session, _customer), fields(product_id = %id))]
pub async fn buy_now(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(_customer): RequireCustomer,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    let mut cart = load_cart(&session).await?;
    match state.cart().buy_now(&mut cart, id).await {
        Ok(()) => {
            save_cart(&session, &cart).await?;
            Ok(Redirect::to("/checkout"))
        }
        Err(err) => form_outcome(&session, "/cart", Err(err.into())).await,
    }
}
