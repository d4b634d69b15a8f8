//! Back-office route handlers.
//!
//! Every handler requires a staff session; staff and customer administration
//! additionally require the manager tier.
//!
//! ```text
//! GET  /admin/me                      - Signed-in staff profile
//!
//! # Orders
//! GET  /admin/orders                  - All orders (?status=)
//! GET  /admin/orders/{id}             - Order detail
//! POST /admin/orders/{id}/approve     - Pending -> Approved
//! POST /admin/orders/{id}/complete    - Pending/Approved -> Completed
//! POST /admin/orders/{id}/cancel      - Cancel and return stock
//!
//! # Catalog
//! GET  /admin/products                - Product list (?category=&page=)
//! POST /admin/products                - Create product
//! GET  /admin/products/{id}           - Product with spec sheet
//! POST /admin/products/{id}           - Update product
//! POST /admin/products/{id}/delete    - Delete product
//! GET  /admin/categories              - Category list
//! POST /admin/categories              - Create category
//! POST /admin/categories/{id}         - Rename category
//! POST /admin/categories/{id}/delete  - Delete category
//!
//! # Accounts (manager)
//! GET  /admin/staff                   - Staff with roles
//! POST /admin/staff                   - Create staff
//! POST /admin/staff/{id}              - Update staff
//! POST /admin/staff/{id}/delete       - Delete staff
//! GET  /admin/customers               - Customers with order counts
//! GET  /admin/customers/{id}          - Customer detail
//! POST /admin/customers/{id}          - Edit customer
//! GET  /admin/customers/{id}/orders   - Customer's orders (?status=)
//! POST /admin/customers/{id}/delete   - Delete customer
//! ```

pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;
pub mod staff;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_sessions::Session;

use smartstore_core::account::Staff;
use smartstore_core::store::{AccountStore, StoreError};

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::state::AppState;

/// Create the back-office router, nested under `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/approve", post(orders::approve))
        .route("/orders/{id}/complete", post(orders::complete))
        .route("/orders/{id}/cancel", post(orders::cancel))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/{id}", get(products::show).post(products::update))
        .route("/products/{id}/delete", post(products::delete))
        // Categories
        .route("/categories", get(categories::index).post(categories::create))
        .route("/categories/{id}", post(categories::rename))
        .route("/categories/{id}/delete", post(categories::delete))
        // Staff
        .route("/staff", get(staff::index).post(staff::create))
        .route("/staff/{id}", post(staff::update))
        .route("/staff/{id}/delete", post(staff::delete))
        // Customers
        .route("/customers", get(customers::index))
        .route("/customers/{id}", get(customers::show).post(customers::update))
        .route("/customers/{id}/orders", get(customers::orders))
        .route("/customers/{id}/delete", post(customers::delete))
}

/// The signed-in staff member with their role.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(current): RequireStaff,
) -> Result<Json<View<Staff>>> {
    let staff = state
        .store()
        .get_staff(current.id)
        .await?
        .ok_or(StoreError::NotFound("staff"))?;
    Ok(Json(View::new(staff, take_flash(&session).await)))
}
