//! Admin about-page editor route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AboutContent;
use crate::state::AppState;

/// About editor template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/about.html")]
pub struct AdminAboutTemplate {
    pub about: AboutContent,
}

/// About form data.
#[derive(Debug, Deserialize)]
pub struct AboutForm {
    pub title: String,
    pub body: String,
    pub contact_email: String,
}

/// Display the about-page editor.
#[instrument(skip(state, _admin))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<AdminAboutTemplate> {
    let about = state.catalog().about().await?;
    Ok(AdminAboutTemplate { about })
}

/// Save the about page.
#[instrument(skip(state, _admin, form))]
pub async fn save(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<AboutForm>,
) -> Result<Redirect> {
    let content = AboutContent {
        title: form.title,
        body: form.body,
        contact_email: form.contact_email,
    };
    state.catalog().save_about(&content).await?;
    Ok(Redirect::to("/admin/about"))
}
