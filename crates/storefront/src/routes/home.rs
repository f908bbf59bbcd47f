//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::Book;
use crate::state::AppState;

/// Book display data for templates.
#[derive(Debug, Clone)]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub price: String,
    pub stock: u32,
    pub description: String,
    pub image: String,
    pub genres: String,
    pub featured: bool,
    pub published: bool,
    pub editorial: String,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            price: book.price.to_string(),
            stock: book.stock,
            description: book.description.clone(),
            image: book.image.clone(),
            genres: book.genres.join(", "),
            featured: book.featured,
            published: book.published,
            editorial: book.editorial.clone().unwrap_or_default(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub featured: Vec<BookView>,
    pub books: Vec<BookView>,
}

/// Display the home page: featured titles above the published catalog.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<HomeTemplate> {
    let books = state.catalog().published_books().await?;
    let featured = books.iter().filter(|b| b.featured).map(BookView::from).collect();
    let books = books.iter().map(BookView::from).collect();

    Ok(HomeTemplate { featured, books })
}
