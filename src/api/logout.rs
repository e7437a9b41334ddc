//! Logout orchestration.
//!
//! The steps run strictly in order within one request: capture the identity,
//! invalidate the local session, clear every auth cookie, then branch on the
//! captured identity for the provider round trip. Each step tolerates the
//! failure of the ones before it; whatever happens, the browser receives a
//! redirect and ends up logged out locally.

use axum::extract::State;
use axum::response::Response;
use tower_cookies::{Cookie, Cookies};
use tower_sessions::Session;

use crate::config::{
    Config, CSRF_COOKIE, LEGACY_SESSION_COOKIE, LOGOUT_SUCCESS_PATH, SESSION_COOKIE,
};
use crate::error::found;
use crate::gate::Identity;
use crate::oidc::LOGOUT_ENDPOINT;
use crate::router::AppState;
use crate::session::IDENTITY_KEY;

pub struct LogoutApi;

impl LogoutApi {
    /// `POST /logout`. Idempotent: a second invocation finds no session and
    /// still clears cookies and redirects.
    pub async fn logout(
        State(state): State<AppState>,
        session: Session,
        cookies: Cookies,
    ) -> Response {
        // The identity must be read before invalidation removes it.
        let identity: Option<Identity> = match session.get(IDENTITY_KEY).await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(error = %err, "could not read identity before invalidation");
                None
            }
        };

        if let Err(err) = session.flush().await {
            tracing::warn!(error = %err, "session invalidation failed; continuing logout");
        }

        clear_auth_cookies(&cookies);

        match identity
            .as_ref()
            .and_then(|identity| identity.id_token.as_deref())
        {
            Some(id_token) => {
                let sid = identity.as_ref().and_then(|identity| identity.sid.as_deref());
                let location = provider_logout_url(&state.config, Some(id_token), sid);
                tracing::info!("redirecting to identity provider logout");
                found(&location)
            }
            None => {
                tracing::debug!("no OIDC identity; redirecting straight to frontend");
                found(&format!("{}?logout=success", state.config.frontend_url))
            }
        }
    }

    /// `GET /logout-success`, the provider's post-logout redirect target.
    /// Cookies are cleared again here: the provider round trip can outlive
    /// the session that started it.
    pub async fn logout_success(State(state): State<AppState>, cookies: Cookies) -> Response {
        tracing::info!("identity provider confirmed logout");

        clear_auth_cookies(&cookies);

        found(&format!(
            "{}?logout=success&oidc=true",
            state.config.frontend_url
        ))
    }
}

/// Instruct the browser to drop the session cookie, the CSRF cookie, and the
/// legacy session cookie, whatever state the server side is in.
pub(crate) fn clear_auth_cookies(cookies: &Cookies) {
    for name in [SESSION_COOKIE, CSRF_COOKIE, LEGACY_SESSION_COOKIE] {
        cookies.add(
            Cookie::build((name, ""))
                .path("/")
                .max_age(time::Duration::ZERO)
                .build(),
        );
    }
}

/// Build the RP-initiated logout URL: `id_token_hint` when the token is
/// present, `sid` when present and non-empty, the gateway's logout-success
/// endpoint as `post_logout_redirect_uri`, and the skip-confirmation hint.
fn provider_logout_url(config: &Config, id_token: Option<&str>, sid: Option<&str>) -> String {
    let post_logout_redirect = format!("{}{}", config.public_url, LOGOUT_SUCCESS_PATH);

    let mut params: Vec<(&str, &str)> = Vec::new();
    if let Some(id_token) = id_token {
        params.push(("id_token_hint", id_token));
    }
    if let Some(sid) = sid {
        if !sid.is_empty() {
            params.push(("sid", sid));
        }
    }
    params.push(("post_logout_redirect_uri", post_logout_redirect.as_str()));
    params.push(("logout", "true"));

    let query = serde_urlencoded::to_string(&params).unwrap_or_default();

    format!("{}{}?{}", config.auth_server_url, LOGOUT_ENDPOINT, query)
}
