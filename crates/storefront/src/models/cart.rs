//! Cart line record.

use serde::Serialize;
use serde_json::{Value, json};

use libreria_core::{CartLineId, Price};

use super::book::Book;

/// One merged, quantity-bearing entry in a user's in-progress selection.
///
/// Lives in the owner's `carrito` sub-collection. Identity for merge
/// purposes is the `(title, author)` pair, not the remote id: two catalog
/// entries with the same title and author merge into one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub title: String,
    pub author: String,
    pub unit_price: Price,
    /// Catalog stock observed when the line was first added.
    pub stock_at_add: u32,
    pub description: String,
    pub image: String,
    pub genres: Vec<String>,
    /// Always >= 1; a decrement below 1 removes the line instead.
    pub quantity: u32,
}

impl CartLine {
    /// Merge identity of this line.
    #[must_use]
    pub fn merge_key(&self) -> (&str, &str) {
        (self.title.as_str(), self.author.as_str())
    }

    /// `unit_price x quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.line_total(self.quantity)
    }

    /// Document payload for the initial create of a line from a catalog
    /// entry.
    #[must_use]
    pub fn fields_for_new(book: &Book, quantity: u32) -> Value {
        json!({
            "title": book.title,
            "author": book.author,
            "price": book.price.to_string(),
            "stock": book.stock,
            "description": book.description,
            "image": book.image,
            "genres": book.genres,
            "quantity": quantity,
        })
    }

    /// Patch payload for a quantity change.
    #[must_use]
    pub fn quantity_patch(quantity: u32) -> Value {
        json!({ "quantity": quantity })
    }
}

/// Sum of line totals over a snapshot.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Price {
    lines
        .iter()
        .fold(Price::zero(), |sum, line| sum.plus(line.line_total()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libreria_core::BookId;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).expect("decimal literal"))
    }

    fn line(title: &str, author: &str, unit: &str, qty: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(format!("{title}-{author}")),
            title: title.to_owned(),
            author: author.to_owned(),
            unit_price: price(unit),
            stock_at_add: 10,
            description: String::new(),
            image: String::new(),
            genres: Vec::new(),
            quantity: qty,
        }
    }

    #[test]
    fn total_sums_line_totals() {
        let lines = vec![
            line("Frankenstein", "Mary Shelley", "29.99", 2),
            line("1984", "George Orwell", "24.99", 1),
        ];
        assert_eq!(cart_total(&lines), price("84.97"));
    }

    #[test]
    fn fields_for_new_carries_catalog_shape() {
        let book = Book {
            id: BookId::new("b1"),
            title: "1984".to_owned(),
            author: "George Orwell".to_owned(),
            price: price("24.99"),
            stock: 7,
            description: "Dystopia".to_owned(),
            image: "img/1984.jpg".to_owned(),
            genres: vec!["fiction".to_owned()],
            featured: false,
            published: true,
            editorial: None,
        };

        let fields = CartLine::fields_for_new(&book, 2);
        assert_eq!(fields.get("quantity"), Some(&serde_json::json!(2)));
        assert_eq!(fields.get("price"), Some(&serde_json::json!("24.99")));
        assert_eq!(fields.get("stock"), Some(&serde_json::json!(7)));
    }
}
