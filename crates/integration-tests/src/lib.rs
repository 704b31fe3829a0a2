//! Integration test harness for the A2A Labs site.
//!
//! Builds the full router (sessions, guard, security headers) over in-memory
//! identity and document backends and drives it with `tower::ServiceExt`.
//! A small cookie jar carries the session between requests, so each
//! [`TestApp`] behaves like one browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p a2a-labs-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use a2a_labs_site::app;
use a2a_labs_site::config::{BackendKind, FirebaseConfig, SiteConfig};
use a2a_labs_site::documents::InMemoryDocumentStore;
use a2a_labs_site::guard::ProfileFailurePolicy;
use a2a_labs_site::identity::{IdentityBackend, InMemoryIdentity};
use a2a_labs_site::middleware::SiteSessionStore;
use a2a_labs_site::state::{AppState, Backends};

/// Password used by [`TestApp::signup`].
pub const TEST_PASSWORD: &str = "correct-horse";

/// Site configuration for tests: no rate limit, in-memory backends.
#[must_use]
pub fn test_config() -> SiteConfig {
    SiteConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("kR7#pQ2!vX9@mZ4$wL6^tN8&yB3*hJ5%"),
        database_url: None,
        rate_limit: false,
        guard_on_profile_error: ProfileFailurePolicy::FailOpen,
        backend: BackendKind::Memory,
        firebase: FirebaseConfig::demo(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A rendered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Assert a redirect and return its target.
    pub fn redirect_target(&self) -> &str {
        assert!(
            self.status.is_redirection(),
            "expected redirect, got {}: {}",
            self.status,
            self.body
        );
        self.location.as_deref().unwrap()
    }
}

/// One browser talking to a fresh site.
pub struct TestApp {
    pub state: AppState,
    pub identity: Option<Arc<InMemoryIdentity>>,
    pub documents: Arc<InMemoryDocumentStore>,
    router: Router,
    jar: Mutex<HashMap<String, String>>,
    listener: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl TestApp {
    /// Site with in-memory identity and documents.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Site with in-memory backends and the given configuration.
    pub fn with_config(config: SiteConfig) -> Self {
        let identity = Arc::new(InMemoryIdentity::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let backends = Backends {
            identity: Some(identity.clone() as Arc<dyn IdentityBackend>),
            documents: documents.clone(),
        };
        Self::build(config, backends, Some(identity), documents)
    }

    /// Site whose identity backend is unconfigured.
    pub fn unconfigured() -> Self {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let backends = Backends {
            identity: None,
            documents: documents.clone(),
        };
        Self::build(test_config(), backends, None, documents)
    }

    fn build(
        config: SiteConfig,
        backends: Backends,
        identity: Option<Arc<InMemoryIdentity>>,
        documents: Arc<InMemoryDocumentStore>,
    ) -> Self {
        let state = AppState::new(config, backends);
        let listener = state.auth().spawn_session_listener();
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../site/static");
        let router = app::router(state.clone(), SiteSessionStore::memory(), static_dir);

        Self {
            state,
            identity,
            documents,
            router,
            jar: Mutex::new(HashMap::new()),
            listener,
        }
    }

    /// A second browser against the same site, with its own cookie jar.
    pub fn other_browser(&self) -> Self {
        Self {
            state: self.state.clone(),
            identity: self.identity.clone(),
            documents: self.documents.clone(),
            router: self.router.clone(),
            jar: Mutex::new(HashMap::new()),
            // The first browser owns the session listener.
            listener: tokio::spawn(async {}),
        }
    }

    /// The in-memory identity backend.
    pub fn identity(&self) -> &InMemoryIdentity {
        self.identity.as_deref().unwrap()
    }

    /// Put a cookie in the jar, as a third-party script would.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    /// Whether the jar holds a cookie called `name`.
    pub fn has_cookie(&self, name: &str) -> bool {
        self.jar.lock().unwrap().contains_key(name)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// POST a urlencoded form.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Follow a redirect response with a GET.
    pub async fn follow(&self, response: &TestResponse) -> TestResponse {
        self.get(response.redirect_target()).await
    }

    /// Sign up through the form and return the landing redirect.
    pub async fn signup(&self, email: &str, display_name: &str) -> TestResponse {
        self.post(
            "/signup",
            &[
                ("display_name", display_name),
                ("email", email),
                ("password", TEST_PASSWORD),
            ],
        )
        .await
    }

    /// Sign in through the form.
    pub async fn signin(&self, email: &str) -> TestResponse {
        self.post("/signin", &[("email", email), ("password", TEST_PASSWORD)])
            .await
    }

    /// Let the session-change listener catch up with backend events.
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        let cookies = self
            .jar
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        builder
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        self.store_cookies(response.headers());

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookies(&self, headers: &axum::http::HeaderMap) {
        let mut jar = self.jar.lock().unwrap();
        for value in headers.get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let mut parts = value.split(';').map(str::trim);
            let Some((name, val)) = parts.next().and_then(|p| p.split_once('=')) else {
                continue;
            };
            let removed = parts.any(|attr| {
                attr.eq_ignore_ascii_case("Max-Age=0") || attr.starts_with("Max-Age=-")
            });
            if removed || val.is_empty() {
                jar.remove(name);
            } else {
                jar.insert(name.to_string(), val.to_string());
            }
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
