//! Business logic services.

pub mod auth;
pub mod profiles;

pub use auth::{AuthError, AuthProvider};
pub use profiles::{ProfileService, StoredProfile};
