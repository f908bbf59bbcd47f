//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//! GET  /about                  - About page
//!
//! # Catalog
//! GET  /book/{id}              - Book detail
//! POST /book/{id}/add          - Add to cart (redirects anonymous users to /login)
//! GET  /inventory              - Inventory listing (requires auth)
//!
//! # Cart
//! GET  /cart                   - Cart page (requires auth)
//! POST /cart/update            - Update line quantity
//! POST /cart/remove            - Remove line
//! POST /cart/reserve           - Submit the reservation batch
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action (seed accounts or identity provider)
//! POST /logout                 - Logout action (tears the cart subscription down)
//! GET  /register               - Registration page
//! POST /register               - Registration action
//! GET  /auth/sso/login         - Redirect to the identity gateway
//! GET  /auth/sso/callback      - Handle the identity gateway callback
//!
//! # Account (requires auth)
//! GET  /profile                - Profile overview + reservation history
//! POST /profile                - Save profile fields
//! POST /profile/avatar         - Upload avatar image
//!
//! # Admin console (requires admin role)
//! GET  /admin                  - Redirect to /admin/books
//! GET  /admin/books            - Catalog back office
//! POST /admin/books            - Create book
//! GET  /admin/books/new        - Create form
//! GET  /admin/books/{id}/edit  - Edit form
//! POST /admin/books/{id}       - Update book
//! POST /admin/books/{id}/delete- Delete book
//! POST /admin/books/{id}/image - Upload cover image
//! GET  /admin/reservations     - Reservation management (optional ?status= filter)
//! POST /admin/reservations/{id}/status - Change reservation status
//! GET  /admin/roles            - User directory + role assignment
//! POST /admin/roles/{doc_id}   - Reassign a user's role
//! GET  /admin/about            - About-page editor
//! POST /admin/about            - Save about page
//!
//! # Employee console (requires employee role)
//! GET  /employee               - Redirect to /employee/books
//! GET  /employee/books         - Catalog (read-only)
//! GET  /employee/reservations  - Reservation management
//! POST /employee/reservations/{id}/status - Change reservation status
//! ```

pub mod about;
pub mod admin;
pub mod auth;
pub mod books;
pub mod cart;
pub mod employee;
pub mod home;
pub mod inventory;
pub mod profile;
pub mod sso;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/auth/sso/login", get(sso::login))
        .route("/auth/sso/callback", get(sso::callback))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/reserve", post(cart::reserve))
}

/// Create the admin console router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/books", get(admin::books::index).post(admin::books::create))
        .route("/books/new", get(admin::books::new_form))
        .route("/books/{id}", post(admin::books::update))
        .route("/books/{id}/edit", get(admin::books::edit_form))
        .route("/books/{id}/delete", post(admin::books::delete))
        .route("/books/{id}/image", post(admin::books::upload_image))
        .route("/reservations", get(admin::reservations::index))
        .route(
            "/reservations/{id}/status",
            post(admin::reservations::change_status),
        )
        .route("/roles", get(admin::roles::index))
        .route("/roles/{doc_id}", post(admin::roles::assign))
        .route("/about", get(admin::about::edit).post(admin::about::save))
}

/// Create the employee console router.
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(employee::dashboard))
        .route("/books", get(employee::books::index))
        .route("/reservations", get(employee::reservations::index))
        .route(
            "/reservations/{id}/status",
            post(employee::reservations::change_status),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // About page
        .route("/about", get(about::show))
        // Book detail + add to cart
        .route("/book/{id}", get(books::show))
        .route("/book/{id}/add", post(books::add_to_cart))
        // Inventory
        .route("/inventory", get(inventory::index))
        // Cart routes
        .nest("/cart", cart_routes())
        // Profile
        .route("/profile", get(profile::show).post(profile::save))
        .route("/profile/avatar", post(profile::upload_avatar))
        // Auth routes
        .merge(auth_routes())
        // Consoles
        .nest("/admin", admin_routes())
        .nest("/employee", employee_routes())
        // Unknown routes redirect home
        .fallback(|| async { Redirect::to("/") })
}
