//! Catalog and site-content service.
//!
//! Thin read/write layer over the `libros` and `configuration`
//! collections. Reads are cached by the HTTP gateway; writes invalidate.

use thiserror::Error;
use tracing::instrument;

use libreria_core::{BookId, Price};

use crate::gateway::{CollectionGateway, GatewayError, SharedGateway, collections, parse};
use crate::models::{AboutContent, Book};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A remote read/write failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The requested book does not exist (or its document is malformed).
    #[error("book not found: {0}")]
    NotFound(BookId),
}

/// A catalog entry as submitted by the admin console.
///
/// Identical to [`Book`] minus the remote-assigned id.
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub price: Price,
    pub stock: u32,
    pub description: String,
    pub image: String,
    pub genres: Vec<String>,
    pub featured: bool,
    pub published: bool,
    pub editorial: Option<String>,
}

impl BookDraft {
    fn to_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "author": self.author,
            "price": self.price.to_string(),
            "stock": self.stock,
            "description": self.description,
            "image": self.image,
            "genres": self.genres,
            "featured": self.featured,
            "published": self.published,
            "editorial": self.editorial,
        })
    }
}

/// Catalog service over the `libros` collection.
pub struct CatalogService {
    gateway: SharedGateway,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Every catalog entry, sorted by title. Back-office view.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn books(&self) -> Result<Vec<Book>, CatalogError> {
        let docs = self.gateway.list(collections::BOOKS).await?;
        let mut books: Vec<Book> = docs.iter().filter_map(parse::parse_book).collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    /// Published catalog entries only. Storefront view.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn published_books(&self) -> Result<Vec<Book>, CatalogError> {
        Ok(self
            .books()
            .await?
            .into_iter()
            .filter(|b| b.published)
            .collect())
    }

    /// Published entries flagged for the home page.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn featured_books(&self) -> Result<Vec<Book>, CatalogError> {
        Ok(self
            .published_books()
            .await?
            .into_iter()
            .filter(|b| b.featured)
            .collect())
    }

    /// One catalog entry by id.
    ///
    /// # Errors
    ///
    /// `CatalogError::NotFound` when the document is absent or malformed.
    pub async fn get(&self, id: &BookId) -> Result<Book, CatalogError> {
        let doc = self
            .gateway
            .get(collections::BOOKS, id.as_str())
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        parse::parse_book(&doc).ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Create a catalog entry.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&self, draft: &BookDraft) -> Result<BookId, CatalogError> {
        let id = self
            .gateway
            .create(collections::BOOKS, draft.to_fields())
            .await?;
        Ok(BookId::new(id))
    }

    /// Replace a catalog entry's fields. Last writer wins; there is no
    /// optimistic-concurrency guard on catalog documents.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn update(&self, id: &BookId, draft: &BookDraft) -> Result<(), CatalogError> {
        self.gateway
            .update(collections::BOOKS, id.as_str(), draft.to_fields())
            .await?;
        Ok(())
    }

    /// Delete a catalog entry.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &BookId) -> Result<(), CatalogError> {
        self.gateway.delete(collections::BOOKS, id.as_str()).await?;
        Ok(())
    }

    /// Point an entry at an uploaded cover image.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self, url))]
    pub async fn set_image(&self, id: &BookId, url: &str) -> Result<(), CatalogError> {
        self.gateway
            .update(
                collections::BOOKS,
                id.as_str(),
                serde_json::json!({ "image": url }),
            )
            .await?;
        Ok(())
    }

    /// The about-page content, defaulting when the document is absent.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn about(&self) -> Result<AboutContent, CatalogError> {
        let doc = self.gateway.get(collections::CONFIGURATION, "about").await?;
        Ok(doc.as_ref().map_or_else(AboutContent::default, parse::parse_about))
    }

    /// Save the about-page content.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self, content))]
    pub async fn save_about(&self, content: &AboutContent) -> Result<(), CatalogError> {
        self.gateway
            .set(collections::CONFIGURATION, "about", content.to_fields())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn draft(title: &str, published: bool, featured: bool) -> BookDraft {
        BookDraft {
            title: title.to_owned(),
            author: "Author".to_owned(),
            price: Price::new(Decimal::from_str("9.99").expect("decimal")),
            stock: 5,
            description: String::new(),
            image: String::new(),
            genres: vec!["fiction".to_owned()],
            featured,
            published,
            editorial: None,
        }
    }

    #[tokio::test]
    async fn storefront_sees_only_published_books() {
        let service = CatalogService::new(Arc::new(MemoryGateway::new()));
        service.create(&draft("Visible", true, false)).await.expect("create");
        service.create(&draft("Hidden", false, false)).await.expect("create");

        assert_eq!(service.books().await.expect("books").len(), 2);
        let published = service.published_books().await.expect("published");
        assert_eq!(published.len(), 1);
        assert_eq!(published.first().expect("book").title, "Visible");
    }

    #[tokio::test]
    async fn featured_requires_published() {
        let service = CatalogService::new(Arc::new(MemoryGateway::new()));
        service.create(&draft("Front", true, true)).await.expect("create");
        service.create(&draft("Draft", false, true)).await.expect("create");

        let featured = service.featured_books().await.expect("featured");
        assert_eq!(featured.len(), 1);
        assert_eq!(featured.first().expect("book").title, "Front");
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let service = CatalogService::new(Arc::new(MemoryGateway::new()));
        let err = service.get(&BookId::new("missing")).await.expect_err("missing");
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn about_defaults_then_round_trips() {
        let service = CatalogService::new(Arc::new(MemoryGateway::new()));
        let about = service.about().await.expect("about");
        assert_eq!(about.title, AboutContent::default().title);

        let updated = AboutContent {
            title: "Our store".to_owned(),
            body: "Books since 2020.".to_owned(),
            contact_email: "hola@libreria.example".to_owned(),
        };
        service.save_about(&updated).await.expect("save");
        assert_eq!(service.about().await.expect("about").title, "Our store");
    }
}
