//! Routing configuration for the gateway.
//!
//! This module provides centralized routing functionality,
//! including router construction and middleware setup.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{any, get, post};
use axum::{middleware, Router};
use http::{header, HeaderName, HeaderValue, Method};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_sessions::service::PrivateCookie;
use tower_sessions::SessionManagerLayer;

use crate::api::logout::LogoutApi;
use crate::api::proxy::ProxyApi;
use crate::api::public::PublicApi;
use crate::config::{Config, CSRF_HEADER};
use crate::error::{self, GatewayInitError};
use crate::oidc::{self, OAuthClient};
use crate::session_storage::MemoryStore;
use crate::{csrf, gate};

/// Timeout for calls to the provider's token endpoint; tighter than the
/// general upstream timeout because a browser is parked on a redirect while
/// these run.
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration
    pub config: Arc<Config>,
    /// OAuth2 client for the configured identity provider
    pub oauth: OAuthClient,
    /// Pooled client used to forward proxied requests
    pub http: reqwest::Client,
    /// Client used for token-endpoint calls
    pub token_http: reqwest::Client,
    /// Session store
    pub session_store: MemoryStore,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, GatewayInitError> {
        let oauth = oidc::build_client(&config)?;

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|source| GatewayInitError::HttpClient { source })?;

        let token_http = reqwest::Client::builder()
            .timeout(TOKEN_ENDPOINT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|source| GatewayInitError::HttpClient { source })?;

        Ok(Self {
            config: Arc::new(config),
            oauth,
            http,
            token_http,
            session_store: MemoryStore::new(),
        })
    }
}

/// Create a router with the given state and session layer
///
/// # Arguments
///
/// * `state` - The application state
/// * `session_layer` - The session manager layer
///
/// # Returns
///
/// A configured router
pub fn create_router(
    state: AppState,
    session_layer: SessionManagerLayer<MemoryStore, PrivateCookie>,
) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/login", get(PublicApi::login_page))
        .route("/error", get(PublicApi::error_page))
        .route("/oauth2/authorization", get(PublicApi::authorize))
        .route("/oauth2/callback", get(PublicApi::callback))
        .route("/logout", post(LogoutApi::logout))
        .route("/logout-success", get(LogoutApi::logout_success))
        .route("/", any(ProxyApi::proxy))
        .route("/*path", any(ProxyApi::proxy))
        .layer(middleware::from_fn(gate::authorization_gate))
        .layer(middleware::from_fn_with_state(state.clone(), csrf::csrf_guard))
        .layer(middleware::map_response(error::handle_auth_errors))
        .layer(PropagateHeaderLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
        .layer(session_layer)
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(SetSensitiveRequestHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
}

/// CORS for the single configured frontend origin. Credentialed, because the
/// session cookie is the credential.
fn cors_layer(config: &Config) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ]);

    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(err) => {
            tracing::warn!(error = %err, "frontend origin is not a valid header value; CORS origin left unset");
        }
    }

    cors
}
