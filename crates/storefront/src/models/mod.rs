//! Typed records for remote documents and session state.

pub mod book;
pub mod cart;
pub mod content;
pub mod reservation;
pub mod session;
pub mod user;

pub use book::Book;
pub use cart::CartLine;
pub use content::AboutContent;
pub use reservation::Reservation;
pub use session::{CurrentUser, session_keys};
pub use user::{DirectoryEntry, RoleDefinition, UserProfile, roles};
