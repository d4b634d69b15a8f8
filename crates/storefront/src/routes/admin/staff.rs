//! Staff administration handlers (manager only).

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use smartstore_core::account::{Role, Staff};
use smartstore_core::{RoleId, StaffId};

use crate::error::{AppError, Result};
use crate::middleware::RequireManager;
use crate::middleware::session::{load_context, save_context, take_flash};
use crate::models::View;
use crate::routes::{form_outcome, non_blank, parse_field};
use crate::services::accounts::StaffForm as StaffInput;
use crate::state::AppState;

/// Staff form data, shared by create and update.
#[derive(Debug, Default, Deserialize)]
pub struct StaffForm {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub email: String,
    pub role_id: Option<String>,
    pub password: Option<String>,
}

impl StaffForm {
    fn input(&self) -> Result<StaffInput<'_>> {
        let role_id = parse_field::<i32>("role", self.role_id.as_deref())?
            .map(RoleId::new)
            .ok_or_else(|| AppError::BadRequest("role is required".to_string()))?;
        Ok(StaffInput {
            name: &self.name,
            phone: non_blank(self.phone.as_deref()),
            email: &self.email,
            role_id,
            password: self.password.as_deref(),
        })
    }
}

/// Staff list with the roles a form can pick from.
#[derive(Debug, Serialize)]
pub struct StaffPage {
    pub staff: Vec<Staff>,
    pub roles: Vec<Role>,
}

/// All staff members.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireManager(_): RequireManager,
) -> Result<Json<View<StaffPage>>> {
    let accounts = state.accounts();
    let page = StaffPage {
        staff: accounts.staff().await?,
        roles: accounts.roles().await?,
    };
    Ok(Json(View::new(page, take_flash(&session).await)))
}

/// Create a staff member.
#[instrument(skip(state, session, manager, form), fields(staff_id = %manager.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireManager(manager): RequireManager,
    Form(form): Form<StaffForm>,
) -> Result<Redirect> {
    let outcome = async {
        let staff = state.accounts().create_staff(form.input()?).await?;
        Ok::<_, AppError>(format!("Staff member {} created", staff.name))
    }
    .await;
    form_outcome(&session, "/admin/staff", outcome).await
}

/// Update a staff member. Editing oneself refreshes the session's role claim.
#[instrument(skip(state, session, manager, form), fields(staff_id = %manager.id, target_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireManager(manager): RequireManager,
    Path(id): Path<StaffId>,
    Form(form): Form<StaffForm>,
) -> Result<Redirect> {
    let outcome = async {
        let staff = state.accounts().update_staff(id, form.input()?).await?;
        let mut ctx = load_context(&session).await?;
        if ctx.refresh_staff(&staff) {
            save_context(&session, &ctx).await?;
            tracing::info!(role = %staff.role.name, "Own staff claim refreshed");
        }
        Ok::<_, AppError>(format!("Staff member {} saved", staff.name))
    }
    .await;
    form_outcome(&session, "/admin/staff", outcome).await
}

/// Delete a staff member. Refused if they approved any order.
#[instrument(skip(state, session, manager), fields(staff_id = %manager.id, target_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireManager(manager): RequireManager,
    Path(id): Path<StaffId>,
) -> Result<Redirect> {
    if id == manager.id {
        return form_outcome(
            &session,
            "/admin/staff",
            Err(AppError::BadRequest(
                "You cannot delete your own account".to_string(),
            )),
        )
        .await;
    }

    let outcome = state
        .accounts()
        .delete_staff(id)
        .await
        .map(|()| "Staff member deleted".to_string())
        .map_err(Into::into);
    form_outcome(&session, "/admin/staff", outcome).await
}
