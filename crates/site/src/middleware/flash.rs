//! One-shot notifications carried across a redirect.
//!
//! Handlers push a flash before redirecting; the next rendered page takes
//! the queued flashes out of the session and shows them as toasts.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl FlashLevel {
    /// CSS modifier used by the toast template.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }
}

/// Queue a flash for the next rendered page.
///
/// Failures are logged; a lost toast never fails the request.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut queued: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    queued.push(flash);

    if let Err(e) = session.insert(session_keys::FLASHES, queued).await {
        tracing::warn!(error = %e, "Failed to queue flash message");
    }
}

/// Extractor that drains queued flashes from the session.
pub struct Flashes(pub Vec<Flash>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(Vec::new()));
        };

        let flashes = session
            .remove::<Vec<Flash>>(session_keys::FLASHES)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(Self(flashes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_queue_in_order_and_drain_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_flash(&session, Flash::success("Welcome back to A2A Labs!")).await;
        push_flash(&session, Flash::error("Something broke")).await;

        let mut parts = axum::http::Request::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts.extensions.insert(session.clone());

        let Flashes(first) = Flashes::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(
            first,
            vec![
                Flash::success("Welcome back to A2A Labs!"),
                Flash::error("Something broke"),
            ]
        );

        let Flashes(second) = Flashes::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(second.is_empty());
    }
}
