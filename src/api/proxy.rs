//! Catch-all reverse proxy with token relay.
//!
//! The route table decides where a request goes; relay routes additionally
//! get the session's access token as a bearer credential. The browser's
//! cookies and any inbound `Authorization` header stop here: upstreams see
//! the relayed token or nothing.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::response::Response;
use http::{header, Method};
use oauth2::RefreshToken;
use tower_sessions::Session;

use crate::config::RouteEntry;
use crate::error::AuthError;
use crate::gate::{Identity, SessionIdentity};
use crate::router::AppState;
use crate::session::IDENTITY_KEY;

const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

pub struct ProxyApi;

impl ProxyApi {
    pub async fn proxy(
        State(state): State<AppState>,
        session: Session,
        user: Option<SessionIdentity>,
        req: Request,
    ) -> Result<Response, AuthError> {
        let route = state.config.routes.resolve(req.uri().path()).clone();

        // Preflight requests carry no credentials and get none relayed.
        let bearer = if route.token_relay && req.method() != Method::OPTIONS {
            let SessionIdentity(identity) = user.ok_or(AuthError::AuthenticationRequired)?;
            Some(ensure_fresh_token(&state, &session, identity).await?)
        } else {
            None
        };

        forward(&state, &route, req, bearer.as_deref()).await
    }
}

/// Return a relay-ready access token, refreshing it through the provider
/// when expired. A failed or impossible refresh forces re-login instead of
/// forwarding a stale token.
async fn ensure_fresh_token(
    state: &AppState,
    session: &Session,
    identity: Identity,
) -> Result<String, AuthError> {
    if !identity.access_token_expired() {
        return Ok(identity.access_token);
    }

    let Some(refresh_token) = identity.refresh_token.clone() else {
        tracing::debug!("access token expired with no refresh token; forcing re-login");
        return Err(AuthError::AuthenticationRequired);
    };

    let token = state
        .oauth
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .request_async(&state.token_http)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "token refresh failed; forcing re-login");
            AuthError::AuthenticationRequired
        })?;

    let refreshed = identity.refreshed(&token);
    if let Err(err) = session.insert(IDENTITY_KEY, &refreshed).await {
        tracing::warn!(error = %err, "could not persist refreshed identity");
    }

    Ok(refreshed.access_token)
}

async fn forward(
    state: &AppState,
    route: &RouteEntry,
    req: Request,
    bearer: Option<&str>,
) -> Result<Response, AuthError> {
    let (parts, body) = req.into_parts();

    let mut url = format!("{}{}", route.target, parts.uri.path());
    if let Some(query) = parts.uri.query() {
        url.push('?');
        url.push_str(query);
    }

    let body = axum::body::to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|err| AuthError::Upstream {
            reason: format!("could not buffer request body: {err}"),
        })?;

    let mut headers = parts.headers.clone();
    for name in [
        header::HOST,
        header::COOKIE,
        header::AUTHORIZATION,
        header::CONNECTION,
        header::CONTENT_LENGTH,
    ] {
        headers.remove(&name);
    }

    let mut upstream_req = state
        .http
        .request(parts.method.clone(), url.as_str())
        .headers(headers)
        .body(body.to_vec());
    if let Some(token) = bearer {
        upstream_req = upstream_req.bearer_auth(token);
    }

    tracing::debug!(route = %route.name, %url, "forwarding request");

    let upstream = upstream_req.send().await.map_err(map_upstream_error)?;

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let bytes: Bytes = upstream.bytes().await.map_err(map_upstream_error)?;

    let mut response = Response::builder().status(status);
    for (name, value) in upstream_headers.iter() {
        // The marker header is an internal contract; an upstream echoing it
        // must not trigger the gateway's redirect rewriting.
        if name != header::TRANSFER_ENCODING
            && name != header::CONNECTION
            && name.as_str() != crate::config::AUTH_ERROR_HEADER
        {
            response = response.header(name, value);
        }
    }

    response
        .body(Body::from(bytes))
        .map_err(|err| AuthError::Upstream {
            reason: format!("could not assemble response: {err}"),
        })
}

fn map_upstream_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::UpstreamTimeout
    } else {
        AuthError::Upstream {
            reason: err.to_string(),
        }
    }
}
