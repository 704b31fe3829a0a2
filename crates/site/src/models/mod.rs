//! Domain models for the site.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
