//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only ever see a generic
//! message for those.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::onboarding::OnboardingError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Wizard operation failed.
    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Onboarding(OnboardingError::Load(_)))
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Onboarding(OnboardingError::Load(_)) => StatusCode::BAD_GATEWAY,
            Self::Onboarding(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Text safe to show the visitor.
    fn public_message(&self) -> String {
        match self {
            Self::Onboarding(OnboardingError::Load(_)) => "External service error".to_string(),
            Self::Onboarding(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after sign-in so errors are associated with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context (logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// ```rust,ignore
/// add_breadcrumb("onboarding", "Advanced step", Some(&[("step", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
