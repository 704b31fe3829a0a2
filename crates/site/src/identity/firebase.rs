//! Firebase Identity Toolkit client.
//!
//! Talks to the `accounts:*` REST endpoints with the web API key. Firebase has
//! no server-side sign-out for ID tokens, so `logout` is a no-op here and the
//! browser session is dropped by the caller.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::instrument;
use url::Url;

use a2a_labs_core::{Email, UserId};

use super::{
    CHANGE_CHANNEL_CAPACITY, FederatedCredential, IdentityBackend, IdentityError, SessionChange,
    SessionHandle,
};
use crate::config::FirebaseConfig;

/// Request timeout for identity calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    request_uri: String,
    changes: broadcast::Sender<SessionChange>,
}

impl FirebaseIdentity {
    /// Create a new client.
    ///
    /// `site_url` is sent as the `requestUri` of federated sign-ins.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig, site_url: &str) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            base_url: config.auth_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_uri: site_url.to_string(),
            changes,
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url, IdentityError> {
        let mut url = Url::parse(&format!("{}/accounts:{method}", self.base_url))
            .map_err(|e| IdentityError::Parse(format!("invalid identity endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP_{}", status.as_u16()));
            tracing::warn!(method, status = status.as_u16(), code = %code, "Identity request rejected");
            return Err(IdentityError::rejected(&code));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    fn publish(&self, change: SessionChange) {
        // No receivers is fine; the listener may not be running yet.
        let _ = self.changes.send(change);
    }

    fn signed_in(&self, auth: AuthResponse) -> Result<SessionHandle, IdentityError> {
        let handle = auth.into_handle()?;
        self.publish(SessionChange::SignedIn {
            user_id: handle.user_id.clone(),
            at: Utc::now(),
        });
        Ok(handle)
    }
}

#[async_trait]
impl IdentityBackend for FirebaseIdentity {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let auth: AuthResponse = self.call("signUp", &body).await?;
        self.signed_in(auth)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn update_display_name(
        &self,
        session: &SessionHandle,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let body = UpdateRequest {
            id_token: session.id_token.expose_secret(),
            display_name,
            return_secure_token: false,
        };
        match self.call::<_, serde_json::Value>("update", &body).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.is_token_expired() {
                    self.publish(SessionChange::TokenExpired {
                        user_id: session.user_id.clone(),
                        at: Utc::now(),
                    });
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn password_login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let auth: AuthResponse = self.call("signInWithPassword", &body).await?;
        self.signed_in(auth)
    }

    #[instrument(skip(self, credential), fields(provider = %credential.provider))]
    async fn federated_login(
        &self,
        credential: &FederatedCredential,
    ) -> Result<SessionHandle, IdentityError> {
        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(credential.id_token.expose_secret()),
            urlencoding::encode(&credential.provider)
        );
        let body = IdpRequest {
            post_body: &post_body,
            request_uri: &self.request_uri,
            return_idp_credential: true,
            return_secure_token: true,
        };
        let auth: AuthResponse = self.call("signInWithIdp", &body).await?;
        self.signed_in(auth)
    }

    #[instrument(skip(self))]
    async fn logout(&self, user_id: &UserId) -> Result<(), IdentityError> {
        tracing::debug!(user_id = %user_id, "Local sign-out");
        Ok(())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        let body = OobRequest {
            request_type: "PASSWORD_RESET",
            email: email.as_str(),
        };
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
}

impl AuthResponse {
    fn into_handle(self) -> Result<SessionHandle, IdentityError> {
        if self.local_id.is_empty() {
            return Err(IdentityError::Parse("response has no localId".to_string()));
        }

        Ok(SessionHandle {
            user_id: UserId::new(self.local_id),
            email: self.email.as_deref().and_then(|e| Email::parse(e).ok()),
            display_name: self.display_name.filter(|n| !n.trim().is_empty()),
            id_token: SecretString::from(self.id_token),
        })
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
