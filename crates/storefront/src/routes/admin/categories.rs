//! Back-office category handlers.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::CategoryId;
use smartstore_core::catalog::Category;

use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::middleware::session::take_flash;
use crate::models::View;
use crate::routes::{form_outcome, non_blank};
use crate::state::AppState;

/// Category form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
}

impl CategoryForm {
    fn name(&self) -> Result<&str> {
        non_blank(self.name.as_deref())
            .ok_or_else(|| AppError::BadRequest("category name is required".to_string()))
    }
}

/// All categories.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(_): RequireStaff,
) -> Result<Json<View<Vec<Category>>>> {
    let categories = state.catalog().categories().await?;
    Ok(Json(View::new(
        categories.to_vec(),
        take_flash(&session).await,
    )))
}

/// Create a category.
#[instrument(skip(state, session, staff, form), fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let outcome = async {
        let category = state.catalog().create_category(form.name()?).await?;
        Ok::<_, AppError>(format!("Category \"{}\" created", category.name))
    }
    .await;
    form_outcome(&session, "/admin/categories", outcome).await
}

/// Rename a category.
#[instrument(skip(state, session, staff, form), fields(staff_id = %staff.id, category_id = %id))]
pub async fn rename(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let outcome = async {
        let category = state.catalog().rename_category(id, form.name()?).await?;
        Ok::<_, AppError>(format!("Category renamed to \"{}\"", category.name))
    }
    .await;
    form_outcome(&session, "/admin/categories", outcome).await
}

/// Delete a category. Refused while products belong to it.
#[instrument(skip(state, session, staff), fields(staff_id = %staff.id, category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<CategoryId>,
) -> Result<Redirect> {
    let outcome = state
        .catalog()
        .delete_category(id)
        .await
        .map(|()| "Category deleted".to_string())
        .map_err(Into::into);
    form_outcome(&session, "/admin/categories", outcome).await
}
