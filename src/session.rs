//! Session management for the gateway.
//!
//! This module provides centralized session management functionality,
//! including session-cookie configuration and key derivation.

use tower_cookies::cookie::SameSite;
use tower_sessions::cookie::Key;
use tower_sessions::service::PrivateCookie;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::{Config, SESSION_COOKIE};
use crate::session_storage::MemoryStore;

/// Keys under which per-session values are stored.
pub(crate) const IDENTITY_KEY: &str = "identity";
pub(crate) const CSRF_TOKEN_KEY: &str = "csrf_token";
pub(crate) const OAUTH_STATE_KEY: &str = "oauth_state";
pub(crate) const PKCE_VERIFIER_KEY: &str = "pkce_verifier";

/// Session cookie options
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// The name of the session cookie
    pub cookie_name: String,
    /// The path for the session cookie
    pub path: String,
    /// The same-site policy for the session cookie
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE.to_string(),
            path: "/".to_string(),
            same_site: SameSite::Lax,
        }
    }
}

/// Create a session manager layer with the given configuration
///
/// # Arguments
///
/// * `config` - The application configuration
/// * `session_config` - Cookie options; defaults to the contract names
/// * `session_store` - The session store
///
/// # Returns
///
/// A session manager layer
pub fn create_session_layer(
    config: &Config,
    session_config: Option<SessionConfig>,
    session_store: MemoryStore,
) -> SessionManagerLayer<MemoryStore, PrivateCookie> {
    let session_config = session_config.unwrap_or_default();

    SessionManagerLayer::new(session_store)
        .with_name(session_config.cookie_name)
        .with_expiry(Expiry::OnInactivity(config.session_timeout))
        .with_same_site(session_config.same_site)
        .with_path(session_config.path)
        .with_secure(!config.dev_mode)
        .with_always_save(false)
        .with_private(session_key(config))
}

/// Derive the cookie encryption key from the configured secret, or generate
/// a throwaway key when none is set (sessions then die with the process).
fn session_key(config: &Config) -> Key {
    match &config.session_secret {
        Some(secret) => Key::derive_from(secret.as_bytes()),
        None => Key::generate(),
    }
}
