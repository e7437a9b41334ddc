//! Double-submit CSRF protection.
//!
//! Mutating requests must present the `X-XSRF-TOKEN` header matching the
//! browser-readable `XSRF-TOKEN` cookie. The token itself is bound to the
//! session and persists for its lifetime, so concurrent tabs keep working;
//! every session-bearing response re-mirrors it into the cookie and the
//! response header for client-side code to pick up.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Method};
use oauth2::CsrfToken;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use tower_sessions::Session;

use crate::config::{CSRF_COOKIE, CSRF_HEADER};
use crate::error::AuthError;
use crate::gate;
use crate::router::AppState;
use crate::session::CSRF_TOKEN_KEY;

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Middleware wrapping every request with the double-submit check and the
/// token mirror. Rejection happens before routing, so a forged request never
/// reaches an upstream.
pub(crate) async fn csrf_guard(
    State(state): State<AppState>,
    cookies: Cookies,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    if is_mutating(req.method()) && !gate::is_public_path(req.uri().path()) {
        let cookie_token = cookies
            .get(CSRF_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let header_token = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());

        let token_matches = matches!(
            (cookie_token.as_deref(), header_token),
            (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header
        );
        if !token_matches {
            return AuthError::CsrfRejected.into_response();
        }
    }

    let mut response = next.run(req).await;

    // A session id only exists once the session has been persisted, so this
    // issues the token exactly on session-establishing and later responses,
    // and stays quiet after logout has flushed the session.
    if session.id().is_some() {
        let token = match session.get::<String>(CSRF_TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                let token = CsrfToken::new_random().secret().clone();
                if let Err(err) = session.insert(CSRF_TOKEN_KEY, &token).await {
                    tracing::warn!(error = %err, "could not persist CSRF token");
                    return response;
                }
                token
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not load CSRF token");
                return response;
            }
        };

        let cookie_is_current = cookies
            .get(CSRF_COOKIE)
            .map(|cookie| cookie.value() == token)
            .unwrap_or(false);
        if !cookie_is_current {
            cookies.add(csrf_cookie(token.clone(), !state.config.dev_mode));
        }

        if let Ok(value) = HeaderValue::from_str(&token) {
            response.headers_mut().insert(CSRF_HEADER, value);
        }
    }

    response
}

/// The CSRF cookie is deliberately readable from client-side script; its
/// value grants nothing without the session cookie next to it.
fn csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
