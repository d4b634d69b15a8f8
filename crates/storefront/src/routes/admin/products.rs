//! Back-office product handlers.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::catalog::{Page, Product, ProductDetail, ProductInput, ProductSpecs};
use smartstore_core::{CategoryId, Price, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::routes::products::ProductQuery;
use crate::routes::{form_outcome, non_blank, parse_field};
use crate::state::AppState;

/// Rows per back-office product page.
const ADMIN_PAGE_SIZE: u32 = 50;

/// Product form data, shared by create and update.
///
/// Spec sheet fields are optional; the sheet is only written when at least
/// one of them is filled in.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub name: Option<String>,
    pub base_price: Option<String>,
    pub sale_price: Option<String>,
    pub stock: Option<String>,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub screen: Option<String>,
    pub operating_system: Option<String>,
    pub rear_camera: Option<String>,
    pub front_camera: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub sim: Option<String>,
    pub battery: Option<String>,
    pub design: Option<String>,
}

fn text(value: Option<&String>) -> Option<String> {
    non_blank(value.map(String::as_str)).map(ToString::to_string)
}

impl ProductForm {
    /// Parse and validate the product fields.
    ///
    /// # Errors
    ///
    /// `BadRequest` for malformed numbers, a missing category, a blank name
    /// or negative prices and stock.
    pub fn input(&self) -> Result<ProductInput> {
        let category_id = parse_field::<i32>("category", self.category_id.as_deref())?
            .map(CategoryId::new)
            .ok_or_else(|| AppError::BadRequest("category is required".to_string()))?;

        let input = ProductInput {
            name: self.name.clone().unwrap_or_default(),
            base_price: parse_field::<Decimal>("base price", self.base_price.as_deref())?
                .map(Price::new),
            sale_price: parse_field::<Decimal>("sale price", self.sale_price.as_deref())?
                .map(Price::new),
            stock: parse_field::<i32>("stock", self.stock.as_deref())?.unwrap_or(0),
            category_id,
            description: text(self.description.as_ref()),
            image: text(self.image.as_ref()),
        };
        input
            .validate()
            .map_err(|err| AppError::BadRequest(err.to_string()))
    }

    /// The spec sheet, if any field was filled in.
    #[must_use]
    pub fn specs(&self) -> Option<ProductSpecs> {
        let specs = ProductSpecs {
            screen: text(self.screen.as_ref()),
            operating_system: text(self.operating_system.as_ref()),
            rear_camera: text(self.rear_camera.as_ref()),
            front_camera: text(self.front_camera.as_ref()),
            cpu: text(self.cpu.as_ref()),
            ram: text(self.ram.as_ref()),
            storage: text(self.storage.as_ref()),
            sim: text(self.sim.as_ref()),
            battery: text(self.battery.as_ref()),
            design: text(self.design.as_ref()),
        };
        (specs != ProductSpecs::default()).then_some(specs)
    }
}

/// Product list, optionally by category.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(_): RequireStaff,
    Query(query): Query<ProductQuery>,
) -> Result<Json<View<Page<Product>>>> {
    let page = state
        .catalog()
        .products(query.to_filter(ADMIN_PAGE_SIZE))
        .await?;
    Ok(Json(View::new(page, take_flash(&session).await)))
}

/// Product with category and spec sheet.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(_): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<Json<View<ProductDetail>>> {
    let detail = state.catalog().product_detail(id).await?;
    Ok(Json(View::new(detail, take_flash(&session).await)))
}

/// Create a product.
#[instrument(skip(state, session, staff, form), fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let created = async {
        let input = form.input()?;
        let product = state
            .catalog()
            .create_product(&input, form.specs().as_ref())
            .await?;
        Ok::<_, AppError>(product)
    }
    .await;

    match created {
        Ok(product) => {
            form_outcome(
                &session,
                &format!("/admin/products/{}", product.id),
                Ok(format!("Product \"{}\" created", product.name)),
            )
            .await
        }
        Err(err) => form_outcome(&session, "/admin/products", Err(err)).await,
    }
}

/// Update a product and, if given, its spec sheet.
#[instrument(skip(state, session, staff, form), fields(staff_id = %staff.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let outcome = async {
        let input = form.input()?;
        let product = state
            .catalog()
            .update_product(id, &input, form.specs().as_ref())
            .await?;
        Ok::<_, AppError>(format!("Product \"{}\" saved", product.name))
    }
    .await;
    form_outcome(&session, &format!("/admin/products/{id}"), outcome).await
}

/// Delete a product. Refused while orders reference it.
#[instrument(skip(state, session, staff), fields(staff_id = %staff.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    let outcome = state
        .catalog()
        .delete_product(id)
        .await
        .map(|()| "Product deleted".to_string())
        .map_err(Into::into);
    form_outcome(&session, "/admin/products", outcome).await
}
