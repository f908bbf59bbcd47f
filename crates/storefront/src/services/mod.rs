//! Application services binding the remote collaborators to the routes.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod reservations;

pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use reservations::ReservationService;
