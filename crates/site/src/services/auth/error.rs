//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
///
/// `Display` output is written for the sign-in pages and is safe to show.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No identity backend credentials are configured.
    #[error("Firebase is not configured. Please set up your Firebase credentials.")]
    BackendUnconfigured,

    /// The identity backend failed or refused the request.
    #[error("{message}")]
    Backend { message: String },

    /// Invalid email format.
    #[error("Please enter a valid email address.")]
    InvalidEmail(#[from] a2a_labs_core::EmailError),

    /// Password shorter than the minimum.
    #[error("Password must be at least {min} characters.")]
    WeakPassword { min: usize },
}
