//! Admin catalog management route handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use libreria_core::{BookId, Price};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::services::catalog::BookDraft;
use crate::state::AppState;

use super::super::home::BookView;

/// Catalog back-office template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/books.html")]
pub struct AdminBooksTemplate {
    pub books: Vec<BookView>,
    pub uploads_enabled: bool,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/book_form.html")]
pub struct BookFormTemplate {
    /// `None` for the create form.
    pub book: Option<BookView>,
    pub action: String,
}

/// Book form data.
#[derive(Debug, Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub price: String,
    pub stock: u32,
    pub description: String,
    pub image: String,
    /// Comma-separated genre list.
    pub genres: String,
    pub featured: Option<String>,
    pub published: Option<String>,
    pub editorial: String,
}

impl BookForm {
    fn into_draft(self) -> Result<BookDraft> {
        let price = Decimal::from_str(self.price.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid price: {}", self.price)))?;

        let mut genres: Vec<String> = self
            .genres
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_owned)
            .collect();
        genres.sort();
        genres.dedup();

        Ok(BookDraft {
            title: self.title.trim().to_owned(),
            author: self.author.trim().to_owned(),
            price: Price::new(price),
            stock: self.stock,
            description: self.description,
            image: self.image,
            genres,
            featured: self.featured.is_some(),
            published: self.published.is_some(),
            editorial: Some(self.editorial.trim().to_owned()).filter(|e| !e.is_empty()),
        })
    }
}

/// List the whole catalog, published or not.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<AdminBooksTemplate> {
    let books = state.catalog().books().await?;
    Ok(AdminBooksTemplate {
        books: books.iter().map(BookView::from).collect(),
        uploads_enabled: state.storage().is_some(),
    })
}

/// Display the create form.
pub async fn new_form(RequireAdmin(_admin): RequireAdmin) -> BookFormTemplate {
    BookFormTemplate {
        book: None,
        action: "/admin/books".to_owned(),
    }
}

/// Create a catalog entry.
#[instrument(skip(state, _admin, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Form(form): Form<BookForm>,
) -> Result<Redirect> {
    if form.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_owned()));
    }
    state.catalog().create(&form.into_draft()?).await?;
    Ok(Redirect::to("/admin/books"))
}

/// Display the edit form for one entry.
#[instrument(skip(state, _admin))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<BookFormTemplate> {
    let book = state.catalog().get(&BookId::new(id)).await?;
    Ok(BookFormTemplate {
        action: format!("/admin/books/{}", book.id),
        book: Some(BookView::from(&book)),
    })
}

/// Update a catalog entry. Last writer wins.
#[instrument(skip(state, _admin, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<BookForm>,
) -> Result<Redirect> {
    state
        .catalog()
        .update(&BookId::new(id), &form.into_draft()?)
        .await?;
    Ok(Redirect::to("/admin/books"))
}

/// Delete a catalog entry.
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    state.catalog().delete(&BookId::new(id)).await?;
    Ok(Redirect::to("/admin/books"))
}

/// Upload a cover image to object storage and point the entry at it.
#[instrument(skip(state, _admin, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let Some(storage) = state.storage() else {
        return Err(AppError::BadRequest(
            "image uploads are not configured".to_owned(),
        ));
    };

    let book_id = BookId::new(id);
    // The entry must exist before accepting bytes for it.
    state.catalog().get(&book_id).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("empty upload".to_owned()));
        }

        let path = format!("covers/{book_id}");
        let url = storage.upload(&path, bytes.to_vec(), &content_type).await?;
        state.catalog().set_image(&book_id, &url).await?;
        break;
    }

    Ok(Redirect::to("/admin/books"))
}
