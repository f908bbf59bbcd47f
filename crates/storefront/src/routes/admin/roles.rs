//! Admin role management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use libreria_core::RoleId;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{DirectoryEntry, RoleDefinition, roles};
use crate::state::AppState;

/// Directory entry display data for templates.
#[derive(Debug, Clone)]
pub struct DirectoryView {
    pub doc_id: String,
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub role_name: String,
}

impl From<&DirectoryEntry> for DirectoryView {
    fn from(entry: &DirectoryEntry) -> Self {
        let role_id = entry
            .role
            .as_ref()
            .map(RoleId::as_str)
            .unwrap_or(roles::STANDARD)
            .to_owned();
        let role_name = RoleDefinition::all()
            .into_iter()
            .find(|r| r.id.as_str() == role_id)
            .map_or("User", |r| r.name)
            .to_owned();

        Self {
            doc_id: entry.doc_id.clone(),
            name: format!("{} {}", entry.first_name, entry.last_name)
                .trim()
                .to_owned(),
            email: entry.email.clone(),
            role_id,
            role_name,
        }
    }
}

/// Role view data for the assignment dropdown.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub id: String,
    pub name: String,
}

/// Role management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/roles.html")]
pub struct AdminRolesTemplate {
    pub users: Vec<DirectoryView>,
    pub roles: Vec<RoleOption>,
}

/// Role assignment form data.
#[derive(Debug, Deserialize)]
pub struct AssignForm {
    pub role: String,
}

/// List the user directory with the seeded role definitions.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<AdminRolesTemplate> {
    let directory = state.auth().directory().await?;
    Ok(AdminRolesTemplate {
        users: directory.iter().map(DirectoryView::from).collect(),
        roles: RoleDefinition::all()
            .into_iter()
            .map(|r| RoleOption {
                id: r.id.to_string(),
                name: r.name.to_owned(),
            })
            .collect(),
    })
}

/// Reassign one user's role-assignment id.
#[instrument(skip(state, _admin, form))]
pub async fn assign(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(doc_id): Path<String>,
    Form(form): Form<AssignForm>,
) -> Result<Redirect> {
    let entry = state
        .auth()
        .directory()
        .await?
        .into_iter()
        .find(|e| e.doc_id == doc_id)
        .ok_or_else(|| AppError::NotFound(format!("user document {doc_id}")))?;

    state
        .auth()
        .assign_role(&entry, &RoleId::new(form.role))
        .await?;

    Ok(Redirect::to("/admin/roles"))
}
