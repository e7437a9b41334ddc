//! Public endpoints: the login surface and the authorization-code flow.
//!
//! The flow moves through `Unauthenticated → AuthorizationRequested →
//! CodeReceived → Authenticated | Failed`; the anti-replay `state` value and
//! PKCE verifier live in the caller's session between the redirect out and
//! the provider's redirect back.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, Scope};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{found, AuthError};
use crate::gate::Identity;
use crate::router::AppState;
use crate::session::{IDENTITY_KEY, OAUTH_STATE_KEY, PKCE_VERIFIER_KEY};

/// Query parameters the provider sends back to the callback.
#[derive(Clone, Debug, Deserialize)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub struct PublicApi;

impl PublicApi {
    pub async fn login_page() -> impl IntoResponse {
        Html(
            r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Redirecting...</title>
    <script>
        document.addEventListener('DOMContentLoaded', function() {
            const form = document.querySelector('form[action="/oauth2/authorization"]');
            if (form) {
                form.submit();
            } else {
                console.error("Login form not found.");
            }
        });
    </script>
</head>
<body>
    <p>Redirecting to login...</p>
    <form action="/oauth2/authorization" method="GET" style="display:none;">
        <button type="submit">Sign in</button>
    </form>
</body>
</html>
"#,
        )
    }

    pub async fn error_page() -> impl IntoResponse {
        Html(
            r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sign-in failed</title>
</head>
<body>
    <p>Sign-in did not complete. <a href="/login">Try again</a>.</p>
</body>
</html>
"#,
        )
    }

    /// Start the flow: remember `state` and the PKCE verifier, then send the
    /// browser to the provider's authorization endpoint.
    pub async fn authorize(
        State(state): State<AppState>,
        session: Session,
    ) -> Result<Response, AuthError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut authorize = state.oauth.authorize_url(CsrfToken::new_random);
        for scope in &state.config.scopes {
            authorize = authorize.add_scope(Scope::new(scope.clone()));
        }
        let (auth_url, csrf_state) = authorize.set_pkce_challenge(pkce_challenge).url();

        session
            .insert(OAUTH_STATE_KEY, csrf_state.secret())
            .await
            .map_err(session_failure)?;
        session
            .insert(PKCE_VERIFIER_KEY, pkce_verifier.secret())
            .await
            .map_err(session_failure)?;
        session.save().await.map_err(session_failure)?;

        tracing::debug!("redirecting to identity provider for authorization");

        Ok(found(auth_url.as_str()))
    }

    /// Complete the flow: check `state` against the issued value, exchange
    /// the code, bind the identity to the session, and return the browser to
    /// the frontend. Any failure is terminal; nothing is retried.
    pub async fn callback(
        State(state): State<AppState>,
        session: Session,
        Query(callback): Query<Callback>,
    ) -> Result<Response, AuthError> {
        if let Some(error) = &callback.error {
            tracing::warn!(error = %error, "identity provider returned an error");
            return Err(AuthError::AuthenticationFailed {
                reason: format!("provider error: {error}"),
            });
        }

        let code = callback
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: "missing authorization code".to_string(),
            })?;
        let returned_state = callback.state.clone().unwrap_or_default();

        let issued_state: Option<String> = session
            .get(OAUTH_STATE_KEY)
            .await
            .map_err(session_failure)?;
        let issued_state = issued_state.ok_or_else(|| AuthError::AuthenticationFailed {
            reason: "no pending authorization request".to_string(),
        })?;

        if issued_state != returned_state {
            tracing::warn!("state mismatch on authorization callback");
            return Err(AuthError::AuthenticationFailed {
                reason: "state mismatch".to_string(),
            });
        }
        let _: Option<String> = session
            .remove(OAUTH_STATE_KEY)
            .await
            .map_err(session_failure)?;

        let verifier: Option<String> = session
            .get(PKCE_VERIFIER_KEY)
            .await
            .map_err(session_failure)?;
        let verifier = verifier.ok_or_else(|| AuthError::AuthenticationFailed {
            reason: "missing PKCE verifier".to_string(),
        })?;
        let _: Option<String> = session
            .remove(PKCE_VERIFIER_KEY)
            .await
            .map_err(session_failure)?;

        let token = state
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(&state.token_http)
            .await
            .map_err(|err| AuthError::AuthenticationFailed {
                reason: format!("token exchange failed: {err}"),
            })?;

        let identity = Identity::from_token_response(&token);

        session.cycle_id().await.map_err(session_failure)?;
        session
            .insert(IDENTITY_KEY, &identity)
            .await
            .map_err(session_failure)?;
        session.save().await.map_err(session_failure)?;

        tracing::info!(subject = %identity.subject, "login complete");

        Ok(found(&state.config.frontend_url))
    }
}

fn session_failure(err: tower_sessions::session::Error) -> AuthError {
    AuthError::AuthenticationFailed {
        reason: format!("session unavailable: {err}"),
    }
}
