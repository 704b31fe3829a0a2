//! Onboarding profile persistence.
//!
//! Profiles live in the `users` collection keyed by user ID. Writes always
//! merge so fields owned by other writers survive.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use a2a_labs_core::{OnboardingProfile, UserId, Username};

use crate::documents::{DocumentError, DocumentStore, Fields};

/// Collection holding one document per user.
pub const USERS_COLLECTION: &str = "users";

/// Fields already stored on a user's document that the wizard resumes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredProfile {
    pub full_name: Option<String>,
    pub username: Option<Username>,
    pub onboarding_complete: bool,
}

/// Profile service over the document store.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whether the user's document says onboarding is complete.
    ///
    /// A missing document or field counts as incomplete.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the store can't be read.
    #[instrument(skip(self))]
    pub async fn onboarding_complete(&self, user_id: &UserId) -> Result<bool, DocumentError> {
        Ok(self.stored(user_id).await?.onboarding_complete)
    }

    /// What is already stored for the user.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the store can't be read.
    #[instrument(skip(self))]
    pub async fn stored(&self, user_id: &UserId) -> Result<StoredProfile, DocumentError> {
        let Some(doc) = self
            .store
            .get_document(USERS_COLLECTION, user_id.as_str())
            .await?
        else {
            return Ok(StoredProfile::default());
        };

        Ok(StoredProfile {
            full_name: doc
                .str_field("fullName")
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            // Anything that doesn't parse was never written by the wizard.
            username: doc
                .str_field("username")
                .and_then(|u| Username::parse(u).ok()),
            onboarding_complete: doc.bool_field("onboardingComplete").unwrap_or(false),
        })
    }

    /// Whether `username` is free for `user_id` to claim.
    ///
    /// A match on the user's own document counts as available.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the query fails.
    #[instrument(skip(self), fields(username = %username))]
    pub async fn is_username_available(
        &self,
        user_id: &UserId,
        username: &Username,
    ) -> Result<bool, DocumentError> {
        let matches = self
            .store
            .query_where(
                USERS_COLLECTION,
                "username",
                &Value::String(username.as_str().to_string()),
            )
            .await?;

        Ok(matches.iter().all(|doc| doc.id == user_id.as_str()))
    }

    /// Merge a completed profile onto the user's document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the write fails.
    #[instrument(skip(self, profile))]
    pub async fn finish(
        &self,
        user_id: &UserId,
        profile: &OnboardingProfile,
    ) -> Result<(), DocumentError> {
        let fields = profile_fields(profile)?;
        self.store
            .set_document(USERS_COLLECTION, user_id.as_str(), fields, true)
            .await?;
        tracing::info!("Onboarding profile saved");
        Ok(())
    }
}

fn profile_fields(profile: &OnboardingProfile) -> Result<Fields, DocumentError> {
    match serde_json::to_value(profile) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DocumentError::Parse(format!(
            "profile serialized to non-object: {other}"
        ))),
        Err(e) => Err(DocumentError::Parse(e.to_string())),
    }
}
