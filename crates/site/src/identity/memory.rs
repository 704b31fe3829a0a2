//! In-process identity backend.
//!
//! Used for local development (`SITE_IDENTITY_BACKEND=memory`) and tests.
//! Passwords are kept in memory as given; never point real users at it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;

use a2a_labs_core::{Email, UserId};

use super::{
    CHANGE_CHANNEL_CAPACITY, FederatedCredential, IdentityBackend, IdentityError, SessionChange,
    SessionHandle,
};

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    email: Email,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
struct FederatedAccount {
    user_id: UserId,
    email: Option<Email>,
    display_name: Option<String>,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    federated: HashMap<String, FederatedAccount>,
    reset_requests: Vec<Email>,
    next_id: u64,
    fail_next: Option<String>,
    fail_update: Option<String>,
}

impl Accounts {
    fn allocate_id(&mut self) -> UserId {
        self.next_id += 1;
        UserId::new(format!("user-{}", self.next_id))
    }

    fn take_failure(&mut self) -> Result<(), IdentityError> {
        match self.fail_next.take() {
            Some(code) => Err(IdentityError::rejected(&code)),
            None => Ok(()),
        }
    }
}

/// Identity backend that keeps accounts in memory.
pub struct InMemoryIdentity {
    accounts: Mutex<Accounts>,
    changes: broadcast::Sender<SessionChange>,
    calls: AtomicUsize,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            accounts: Mutex::new(Accounts::default()),
            changes,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of backend operations invoked so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next operation fail with the given backend error code.
    pub fn fail_next(&self, code: &str) {
        self.lock().fail_next = Some(code.to_string());
    }

    /// Make the next display-name update fail with the given code.
    pub fn fail_display_name_update(&self, code: &str) {
        self.lock().fail_update = Some(code.to_string());
    }

    /// Register an identity-provider token that `federated_login` will accept.
    pub fn register_federated(
        &self,
        id_token: &str,
        email: Option<Email>,
        display_name: Option<&str>,
    ) -> UserId {
        let mut accounts = self.lock();
        let user_id = accounts.allocate_id();
        accounts.federated.insert(
            id_token.to_string(),
            FederatedAccount {
                user_id: user_id.clone(),
                email,
                display_name: display_name.map(str::to_string),
            },
        );
        user_id
    }

    /// Display name stored for an email account.
    #[must_use]
    pub fn display_name_of(&self, email: &Email) -> Option<String> {
        self.lock()
            .by_email
            .get(email.as_str())
            .and_then(|a| a.display_name.clone())
    }

    /// Emails that requested a password reset, oldest first.
    #[must_use]
    pub fn reset_requests(&self) -> Vec<Email> {
        self.lock().reset_requests.clone()
    }

    /// Simulate the backend ending a user's session out of band.
    pub fn force_sign_out(&self, user_id: &UserId) {
        let _ = self.changes.send(SessionChange::SignedOut {
            user_id: user_id.clone(),
            at: Utc::now(),
        });
    }

    /// Simulate a user's token expiring.
    pub fn expire_token(&self, user_id: &UserId) {
        let _ = self.changes.send(SessionChange::TokenExpired {
            user_id: user_id.clone(),
            at: Utc::now(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Accounts> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> std::sync::MutexGuard<'_, Accounts> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }

    fn signed_in(
        &self,
        user_id: UserId,
        email: Option<Email>,
        display_name: Option<String>,
    ) -> SessionHandle {
        let _ = self.changes.send(SessionChange::SignedIn {
            user_id: user_id.clone(),
            at: Utc::now(),
        });
        SessionHandle {
            id_token: SecretString::from(format!("memory-token-{user_id}")),
            user_id,
            email,
            display_name,
        }
    }
}

#[async_trait]
impl IdentityBackend for InMemoryIdentity {
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError> {
        let user_id = {
            let mut accounts = self.begin();
            accounts.take_failure()?;
            if accounts.by_email.contains_key(email.as_str()) {
                return Err(IdentityError::rejected("EMAIL_EXISTS"));
            }
            let user_id = accounts.allocate_id();
            accounts.by_email.insert(
                email.as_str().to_string(),
                Account {
                    user_id: user_id.clone(),
                    email: email.clone(),
                    password: password.expose_secret().to_string(),
                    display_name: None,
                },
            );
            user_id
        };

        Ok(self.signed_in(user_id, Some(email.clone()), None))
    }

    async fn update_display_name(
        &self,
        session: &SessionHandle,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.begin();
        accounts.take_failure()?;
        if let Some(code) = accounts.fail_update.take() {
            return Err(IdentityError::rejected(&code));
        }
        let account = accounts
            .by_email
            .values_mut()
            .find(|a| a.user_id == session.user_id)
            .ok_or_else(|| IdentityError::rejected("USER_NOT_FOUND"))?;
        account.display_name = Some(display_name.to_string());
        Ok(())
    }

    async fn password_login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError> {
        let account = {
            let mut accounts = self.begin();
            accounts.take_failure()?;
            accounts
                .by_email
                .get(email.as_str())
                .filter(|a| a.password == password.expose_secret())
                .cloned()
                .ok_or_else(|| IdentityError::rejected("INVALID_LOGIN_CREDENTIALS"))?
        };

        Ok(self.signed_in(account.user_id, Some(account.email), account.display_name))
    }

    async fn federated_login(
        &self,
        credential: &FederatedCredential,
    ) -> Result<SessionHandle, IdentityError> {
        let account = {
            let mut accounts = self.begin();
            accounts.take_failure()?;
            accounts
                .federated
                .get(credential.id_token.expose_secret())
                .cloned()
                .ok_or_else(|| IdentityError::rejected("INVALID_IDP_RESPONSE"))?
        };

        Ok(self.signed_in(account.user_id, account.email, account.display_name))
    }

    async fn logout(&self, _user_id: &UserId) -> Result<(), IdentityError> {
        self.begin().take_failure()?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        let mut accounts = self.begin();
        accounts.take_failure()?;
        accounts.reset_requests.push(email.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}
