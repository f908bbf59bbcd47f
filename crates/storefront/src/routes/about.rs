//! About page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::AboutContent;
use crate::state::AppState;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub about: AboutContent,
}

/// Display the about page from the `configuration/about` document.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<AboutTemplate> {
    let about = state.catalog().about().await?;
    Ok(AboutTemplate { about })
}
