//! Employee catalog view route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireEmployee;
use crate::state::AppState;

use super::super::home::BookView;

/// Employee catalog template (read-only).
#[derive(Template, WebTemplate)]
#[template(path = "employee/books.html")]
pub struct EmployeeBooksTemplate {
    pub books: Vec<BookView>,
}

/// List the whole catalog for staff, published or not.
#[instrument(skip(state, _employee))]
pub async fn index(
    State(state): State<AppState>,
    RequireEmployee(_employee): RequireEmployee,
) -> Result<EmployeeBooksTemplate> {
    let books = state.catalog().books().await?;
    Ok(EmployeeBooksTemplate {
        books: books.iter().map(BookView::from).collect(),
    })
}
