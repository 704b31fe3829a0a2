//! Configuration check.
//!
//! Loads the site configuration the way the server does and reports which
//! backends it would use, without starting anything.

use a2a_labs_site::config::{BackendKind, ConfigError, SiteConfig};

/// Load the site config and log a summary.
///
/// # Errors
///
/// Returns `ConfigError` if the server would refuse to start.
pub fn check() -> Result<(), ConfigError> {
    let config = SiteConfig::from_env()?;

    let identity = match config.backend {
        BackendKind::Memory => "in-memory",
        BackendKind::Firebase if config.firebase.is_configured() => "firebase",
        BackendKind::Firebase => "unconfigured (auth disabled)",
    };
    let sessions = if config.database_url.is_some() {
        "postgres"
    } else {
        "in-memory"
    };

    tracing::info!(
        addr = %config.socket_addr(),
        base_url = %config.base_url,
        identity,
        sessions,
        rate_limit = config.rate_limit,
        guard_on_profile_error = %config.guard_on_profile_error,
        google_sign_in = config.firebase.google_client_id.is_some(),
        sentry = config.sentry_dsn.is_some(),
        "Configuration OK"
    );
    Ok(())
}
