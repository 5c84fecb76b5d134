//! Business logic services for admin.
//!
//! # Services
//!
//! - `users` - User directory over the user store and reference data

pub mod users;

pub use users::{DirectoryError, UserDirectory, UserPage, UserScope};
