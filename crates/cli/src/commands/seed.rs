//! Seed the remote collections with the initial catalog, the role
//! documents, and the about page.
//!
//! Catalog and role contents mirror the deployed backend project: the
//! role-assignment ids are constants referenced from user documents, and
//! the starter catalog is the storefront's original five titles.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use libreria_storefront::config::GatewayConfig;
use libreria_storefront::gateway::{
    CollectionGateway, HttpGateway, MemoryGateway, SharedGateway, collections,
};
use libreria_storefront::models::{AboutContent, roles};

/// Build a gateway client from the environment.
///
/// Reuses the storefront's configuration loading so `GATEWAY_MODE`,
/// `GATEWAY_PROJECT_ID`, and `GATEWAY_API_KEY` behave identically.
///
/// # Errors
///
/// Returns an error when required gateway variables are missing.
pub fn gateway_from_env() -> Result<SharedGateway, Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    match std::env::var("GATEWAY_MODE").as_deref() {
        Ok("memory") => {
            info!("using in-memory gateway (dry run)");
            Ok(Arc::new(MemoryGateway::new()))
        }
        _ => {
            // Only the gateway section matters here; fail with the same
            // messages the storefront would.
            let config = GatewayConfig::from_env()?;
            Ok(Arc::new(HttpGateway::new(&config)))
        }
    }
}

/// One starter catalog entry.
struct StarterBook {
    title: &'static str,
    author: &'static str,
    price: &'static str,
    stock: u32,
    description: &'static str,
    image: &'static str,
    genres: &'static [&'static str],
    featured: bool,
}

const STARTER_CATALOG: &[StarterBook] = &[
    StarterBook {
        title: "Frankenstein",
        author: "Mary Shelley",
        price: "29.99",
        stock: 12,
        description: "Frankenstein; or, The Modern Prometheus. Published in 1818 \
                      and widely considered the first science-fiction novel.",
        image: "/static/images/frankenstein.jpg",
        genres: &["horror", "science fiction"],
        featured: true,
    },
    StarterBook {
        title: "1984",
        author: "George Orwell",
        price: "24.99",
        stock: 20,
        description: "A dystopian vision of a future where the government keeps \
                      power through surveillance and thought control.",
        image: "/static/images/1984.jpg",
        genres: &["fiction", "dystopia"],
        featured: true,
    },
    StarterBook {
        title: "Cien años de soledad",
        author: "Gabriel García Márquez",
        price: "34.99",
        stock: 8,
        description: "The landmark of magical realism: seven generations of the \
                      Buendía family in the town of Macondo.",
        image: "/static/images/cien-anos.jpg",
        genres: &["fiction", "magical realism"],
        featured: false,
    },
    StarterBook {
        title: "El Señor de los Anillos",
        author: "J.R.R. Tolkien",
        price: "45.99",
        stock: 10,
        description: "The epic journey of Frodo Baggins to destroy the One Ring \
                      and defeat the Dark Lord Sauron.",
        image: "/static/images/lotr.jpg",
        genres: &["fantasy"],
        featured: false,
    },
    StarterBook {
        title: "Don Quijote de la Mancha",
        author: "Miguel de Cervantes",
        price: "39.99",
        stock: 6,
        description: "The most influential work of Spanish literature and one of \
                      the pillars of the Western canon.",
        image: "/static/images/quijote.jpg",
        genres: &["classics"],
        featured: false,
    },
];

/// Seed the book catalog, skipping titles that already exist.
///
/// # Errors
///
/// Returns an error when a gateway write fails.
pub async fn books(gateway: &SharedGateway) -> Result<(), Box<dyn std::error::Error>> {
    let existing = gateway.list(collections::BOOKS).await?;
    let existing_titles: Vec<String> = existing
        .iter()
        .filter_map(|doc| {
            doc.fields
                .get("title")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .collect();

    let mut created = 0;
    for book in STARTER_CATALOG {
        if existing_titles.iter().any(|t| t == book.title) {
            info!(title = book.title, "already present, skipping");
            continue;
        }

        gateway
            .create(
                collections::BOOKS,
                json!({
                    "title": book.title,
                    "author": book.author,
                    "price": book.price,
                    "stock": book.stock,
                    "description": book.description,
                    "image": book.image,
                    "genres": book.genres,
                    "featured": book.featured,
                    "published": true,
                    "editorial": null,
                }),
            )
            .await?;
        created += 1;
    }

    info!(created, "catalog seeded");
    Ok(())
}

/// Seed the three role-assignment documents under their fixed ids.
///
/// # Errors
///
/// Returns an error when a gateway write fails.
pub async fn roles(gateway: &SharedGateway) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = [
        (roles::ADMINISTRATOR, "Administrator", "Full administrative privileges"),
        (roles::EMPLOYEE, "Employee", "Staff role"),
        (roles::STANDARD, "User", "Standard customer role"),
    ];

    for (id, name, description) in definitions {
        gateway
            .set(
                "roles",
                id,
                json!({ "name": name, "description": description }),
            )
            .await?;
        info!(id, name, "role document seeded");
    }

    Ok(())
}

/// Seed the about page with its default content, if absent.
///
/// # Errors
///
/// Returns an error when a gateway write fails.
pub async fn about(gateway: &SharedGateway) -> Result<(), Box<dyn std::error::Error>> {
    if gateway
        .get(collections::CONFIGURATION, "about")
        .await?
        .is_some()
    {
        info!("about page already present, skipping");
        return Ok(());
    }

    gateway
        .set(
            collections::CONFIGURATION,
            "about",
            AboutContent::default().to_fields(),
        )
        .await?;
    info!("about page seeded");
    Ok(())
}
