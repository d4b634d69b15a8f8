//! Back-office order handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::OrderId;
use smartstore_core::order::{LifecycleAction, OrderDetail};
use smartstore_core::session::CurrentStaff;

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::routes::{StatusQuery, form_outcome};
use crate::state::AppState;

/// All orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(_): RequireStaff,
    Query(query): Query<StatusQuery>,
) -> Result<Json<View<Vec<OrderDetail>>>> {
    let orders = state.orders().all(query.status()).await?;
    Ok(Json(View::new(orders, take_flash(&session).await)))
}

/// Order detail with lines, customer and approver.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(_): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<View<OrderDetail>>> {
    let order = state.orders().get(id).await?;
    Ok(Json(View::new(order, take_flash(&session).await)))
}

async fn run(
    state: &AppState,
    session: &Session,
    staff: &CurrentStaff,
    id: OrderId,
    action: LifecycleAction,
) -> Result<Redirect> {
    let outcome = state
        .orders()
        .apply(id, action, staff)
        .await
        .map(|outcome| {
            if outcome.applied {
                format!("Order #{id} is now {}", outcome.order.status)
            } else {
                format!("Order #{id} is already {}", outcome.order.status)
            }
        })
        .map_err(Into::into);
    form_outcome(session, &format!("/admin/orders/{id}"), outcome).await
}

/// Approve a pending order.
#[instrument(skip(state, session, staff), fields(staff_id = %staff.id))]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Redirect> {
    run(&state, &session, &staff, id, LifecycleAction::Approve).await
}

/// Mark an order delivered.
#[instrument(skip(state, session, staff), fields(staff_id = %staff.id))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Redirect> {
    run(&state, &session, &staff, id, LifecycleAction::Complete).await
}

/// Cancel an order and return its stock.
#[instrument(skip(state, session, staff), fields(staff_id = %staff.id))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Redirect> {
    run(&state, &session, &staff, id, LifecycleAction::Cancel).await
}
