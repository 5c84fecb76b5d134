//! Core types for VIP Admin.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the admin server and the CLI.

pub mod email;
pub mod id;
pub mod localized;
pub mod paged;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use localized::{LocalizedString, ReferenceEntity, ReferenceKind, localized_value};
pub use paged::PagedResult;
pub use user::{
    IdentityScheme, Role, StoredUser, UserIdentity, UserKey, UserRecord, UserValue,
    UserValueError, parse_user_value,
};
