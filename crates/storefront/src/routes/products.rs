//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::catalog::{Category, Page, Product, ProductDetail, ProductFilter, ProductSort};
use smartstore_core::{CategoryId, Price, ProductId};

use super::parse_lenient;
use crate::error::Result;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::state::AppState;

/// Catalog listing query. Every field is optional and parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl ProductQuery {
    /// Build the store filter with the configured page size.
    #[must_use]
    pub fn to_filter(&self, page_size: u32) -> ProductFilter {
        ProductFilter {
            category: parse_lenient::<i32>(self.category.as_deref()).map(CategoryId::new),
            keyword: self.q.clone(),
            min_price: parse_lenient::<Decimal>(self.min_price.as_deref()).map(Price::new),
            max_price: parse_lenient::<Decimal>(self.max_price.as_deref()).map(Price::new),
            sort: ProductSort::parse_lenient(self.sort.as_deref()),
            page: parse_lenient(self.page.as_deref()).unwrap_or(1),
            page_size,
        }
        .normalized()
    }
}

/// List products.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProductQuery>,
) -> Result<Json<View<Page<Product>>>> {
    let filter = query.to_filter(state.config().page_size);
    let page = state.catalog().products(filter).await?;
    Ok(Json(View::new(page, take_flash(&session).await)))
}

/// Show one product.
#[instrument(skip(state, session), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<View<ProductDetail>>> {
    let detail = state.catalog().product_detail(id).await?;
    Ok(Json(View::new(detail, take_flash(&session).await)))
}

/// List categories.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().categories().await?.to_vec()))
}
