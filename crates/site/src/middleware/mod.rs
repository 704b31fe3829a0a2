//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and isolation policies)
//! 5. Session layer (tower-sessions, `PostgreSQL` or memory store)
//! 6. Route guard (onboarding redirects)
//! 7. Rate limiting (governor, auth routes only)

pub mod auth;
pub mod flash;
pub mod guard;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, current_user, set_current_user};
pub use flash::{Flash, FlashLevel, Flashes, push_flash};
pub use guard::route_guard;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SiteSessionStore, create_session_layer};
