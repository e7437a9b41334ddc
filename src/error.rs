//! Error handling for the gateway.
//!
//! Authentication and authorization failures are tagged with a marker header
//! by their [`IntoResponse`] impl; the outer [`handle_auth_errors`] pass then
//! rewrites the recoverable ones into redirects so the browser always lands
//! on a navigable page instead of a bare status code.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use custom_error::custom_error;
use http::StatusCode;
use serde_json::json;

use crate::config::{AUTHORIZATION_PATH, AUTH_ERROR_HEADER, ERROR_PATH};

custom_error! {
    pub AuthError
        AuthenticationRequired = "no authenticated session for a protected request",
        AuthenticationRejected = "unauthenticated state-changing request rejected",
        AuthenticationFailed{reason: String} = "authentication failed: {reason}",
        CsrfRejected = "missing or mismatched CSRF token",
        UpstreamTimeout = "upstream call timed out",
        Upstream{reason: String} = "upstream call failed: {reason}",
}

impl AuthError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::AuthenticationRequired => {
                (StatusCode::UNAUTHORIZED, "authentication-required")
            }
            AuthError::AuthenticationRejected => {
                (StatusCode::UNAUTHORIZED, "authentication-rejected")
            }
            AuthError::AuthenticationFailed { .. } => {
                (StatusCode::UNAUTHORIZED, "authentication-failed")
            }
            AuthError::CsrfRejected => (StatusCode::FORBIDDEN, "csrf-rejected"),
            AuthError::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "upstream-timeout"),
            AuthError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream-error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, marker) = self.classify();

        if status.is_server_error() {
            tracing::warn!(error = %self, "upstream failure");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = Json(json!({
            "error": marker,
        }));

        (status, [(AUTH_ERROR_HEADER, marker)], body).into_response()
    }
}

/// Build a 302 Found redirect. All gateway redirects use this status; the
/// target travels in `Location` only, never in a body.
pub(crate) fn found(location: &str) -> Response {
    match Response::builder()
        .status(StatusCode::FOUND)
        .header(http::header::LOCATION, location)
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Middleware for rewriting tagged authentication failures into redirects.
///
/// A missing session becomes a redirect into the authorization-code flow; a
/// failed login becomes a redirect to the error page. Authorization failures
/// (CSRF, rejected mutations) keep their terminal status.
pub async fn handle_auth_errors(response: Response) -> Response {
    let marker = response
        .headers()
        .get(AUTH_ERROR_HEADER)
        .and_then(|header_value| header_value.to_str().ok());

    match (response.status(), marker) {
        (StatusCode::UNAUTHORIZED, Some("authentication-required")) => found(AUTHORIZATION_PATH),
        (StatusCode::UNAUTHORIZED, Some("authentication-failed")) => found(ERROR_PATH),
        _ => response,
    }
}

custom_error! {
    pub GatewayInitError
        OAuthEndpoint{source: oauth2::url::ParseError} = "invalid identity provider endpoint: {source}",
        HttpClient{source: reqwest::Error} = "could not build HTTP client: {source}",
}
