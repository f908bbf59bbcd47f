//! Catalog item record.

use serde::Serialize;

use libreria_core::{BookId, Price};

/// A catalog entry.
///
/// Read-heavy, admin-mutated; there is no versioning or
/// optimistic-concurrency guard on the remote document - last writer wins.
/// Writes go through `BookDraft` in the catalog service; this record is
/// what the parse boundary produces for readers.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
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
