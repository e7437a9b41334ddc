//! Configuration management for the gateway.
//!
//! This module centralizes all configuration settings and provides validation
//! for required configuration at startup.

use std::env;
use std::time::Duration;

/// Cookie names. These are part of the browser-facing contract.
pub const SESSION_COOKIE: &str = "SESSION";
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";
/// Cleared defensively on logout for deployments migrating off the old stack.
pub const LEGACY_SESSION_COOKIE: &str = "JSESSIONID";

/// CSRF token header, accepted on mutating requests and mirrored on responses.
pub const CSRF_HEADER: &str = "x-xsrf-token";
/// Marker header carrying the machine-readable failure kind.
pub const AUTH_ERROR_HEADER: &str = "x-auth-error";

/// Local endpoints referenced across modules.
pub const AUTHORIZATION_PATH: &str = "/oauth2/authorization";
pub const CALLBACK_PATH: &str = "/oauth2/callback";
pub const LOGOUT_SUCCESS_PATH: &str = "/logout-success";
pub const ERROR_PATH: &str = "/error";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Socket address the gateway listens on
    pub listen_addr: String,
    /// The externally visible URL of this gateway
    pub public_url: String,
    /// The frontend origin the browser is sent back to
    pub frontend_url: String,
    /// The base URL of the identity provider
    pub auth_server_url: String,
    /// The client ID for OAuth authentication
    pub client_id: String,
    /// The client secret for OAuth authentication
    pub client_secret: String,
    /// Scopes requested during the authorization-code flow
    pub scopes: Vec<String>,
    /// Inactivity timeout applied to sessions
    pub session_timeout: time::Duration,
    /// Secret the session cookie keys are derived from; generated when absent
    pub session_secret: Option<String>,
    /// Timeout applied to every upstream call
    pub upstream_timeout: Duration,
    /// Whether the gateway is running in development mode
    pub dev_mode: bool,
    /// Upstream routing table
    pub routes: RouteTable,
}

impl Config {
    /// Create a new configuration from environment variables
    ///
    /// # Returns
    ///
    /// A Result containing the configuration or an error if required values
    /// are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_url = normalize_url(require("APP_URL")?);
        let frontend_url = normalize_url(require("FRONTEND_URL")?);
        let auth_server_url = normalize_url(require("AUTH_SERVER_URL")?);
        let client_id = require("CLIENT_ID")?;
        let client_secret = require("CLIENT_SECRET")?;

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8888".to_string());

        let scopes = env::var("OAUTH_SCOPES")
            .unwrap_or_else(|_| "openid email profile".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let session_timeout = time::Duration::seconds(parse_var("SESSION_TIMEOUT_SECS", 1800)?);
        let upstream_timeout = Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", 30u64)?);

        let session_secret = env::var("SESSION_SECRET").ok();
        if let Some(secret) = &session_secret {
            if secret.len() < 32 {
                return Err(ConfigError::InvalidValue {
                    name: "SESSION_SECRET",
                    reason: "must be at least 32 bytes".to_string(),
                });
            }
        }

        let dev_mode = env::var("DEV_MODE")
            .map(|var| var == "true")
            .unwrap_or(false);

        let routes = RouteTable::parse(
            env::var("ROUTES").unwrap_or_default().as_str(),
            &frontend_url,
        )?;

        Ok(Config {
            listen_addr,
            public_url,
            frontend_url,
            auth_server_url,
            client_id,
            client_secret,
            scopes,
            session_timeout,
            session_secret,
            upstream_timeout,
            dev_mode,
            routes,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingValue(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|err| ConfigError::InvalidValue {
            name,
            reason: format!("{err}"),
        }),
        Err(_) => Ok(default),
    }
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// A single upstream mapping: requests whose path starts with `prefix` are
/// forwarded to `target`, optionally carrying the session's access token.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub name: String,
    pub prefix: String,
    pub target: String,
    pub token_relay: bool,
}

/// Ordered, read-only routing table consulted on every proxied request.
///
/// The final entry always targets the frontend origin, so resolution never
/// fails: page and asset requests fall through to the SSR server.
#[derive(Clone, Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Parse a route specification of the form
    /// `name prefix target [relay]; name prefix target [relay]; ...`.
    pub fn parse(definitions: &str, frontend_url: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();

        for raw in definitions.split(';') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let fields: Vec<&str> = raw.split_whitespace().collect();
            let entry = match fields.as_slice() {
                [name, prefix, target] => RouteEntry {
                    name: (*name).to_string(),
                    prefix: (*prefix).to_string(),
                    target: normalize_url((*target).to_string()),
                    token_relay: false,
                },
                [name, prefix, target, "relay"] => RouteEntry {
                    name: (*name).to_string(),
                    prefix: (*prefix).to_string(),
                    target: normalize_url((*target).to_string()),
                    token_relay: true,
                },
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "ROUTES",
                        reason: format!("malformed route entry: {raw:?}"),
                    })
                }
            };
            entries.push(entry);
        }

        entries.push(RouteEntry {
            name: "frontend".to_string(),
            prefix: "/".to_string(),
            target: normalize_url(frontend_url.to_string()),
            token_relay: false,
        });

        Ok(Self { entries })
    }

    /// Resolve a request path to its route entry, first match wins.
    pub fn resolve(&self, path: &str) -> &RouteEntry {
        self.entries
            .iter()
            .find(|entry| path.starts_with(&entry.prefix))
            .unwrap_or_else(|| &self.entries[self.entries.len() - 1])
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration value is missing
    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),
    /// A configuration value is present but malformed
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_routes_in_declaration_order() {
        let table = RouteTable::parse(
            "products /api/v1/products http://localhost:8081 relay; \
             orders /api/v1/orders http://localhost:8082 relay; \
             assets /_next http://localhost:3000",
            "http://localhost:3000",
        )
        .unwrap();

        let entry = table.resolve("/api/v1/products/42");
        assert_eq!(entry.name, "products");
        assert!(entry.token_relay);

        let entry = table.resolve("/api/v1/orders");
        assert_eq!(entry.name, "orders");

        let entry = table.resolve("/_next/static/chunk.js");
        assert_eq!(entry.name, "assets");
        assert!(!entry.token_relay);
    }

    #[test]
    fn unmatched_paths_fall_through_to_frontend() {
        let table = RouteTable::parse(
            "orders /api/v1/orders http://localhost:8082 relay",
            "http://localhost:3000",
        )
        .unwrap();

        let entry = table.resolve("/app/dashboard");
        assert_eq!(entry.name, "frontend");
        assert_eq!(entry.target, "http://localhost:3000");
        assert!(!entry.token_relay);
    }

    #[test]
    fn empty_spec_yields_frontend_only() {
        let table = RouteTable::parse("", "http://localhost:3000/").unwrap();
        let entry = table.resolve("/anything");
        assert_eq!(entry.name, "frontend");
        assert_eq!(entry.target, "http://localhost:3000");
    }

    #[test]
    fn malformed_entry_is_named_in_the_error() {
        let err = RouteTable::parse("orders /api/v1/orders", "http://localhost:3000").unwrap_err();
        match err {
            ConfigError::InvalidValue { name, reason } => {
                assert_eq!(name, "ROUTES");
                assert!(reason.contains("orders /api/v1/orders"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = RouteTable::parse(
            "orders /api/v1/orders http://localhost:8082 passthrough",
            "http://localhost:3000",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
