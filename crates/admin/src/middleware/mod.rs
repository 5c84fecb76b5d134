//! HTTP middleware and extractors for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Path normalization (trailing slashes, applied before routing)
//! 2. Sentry layers (capture errors, one hub per request)
//! 3. `TraceLayer` (request span with status and latency)
//!
//! Authentication happens in the proxy in front of the admin; handlers read
//! the forwarded identity with the [`CurrentUser`] extractor.

pub mod identity;

pub use identity::{CurrentUser, USER_EMAIL_HEADER, USER_ID_HEADER};
