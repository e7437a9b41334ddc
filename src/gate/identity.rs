use std::fmt;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, TimeDelta, Utc};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AuthError;
use crate::oidc::{self, GatewayTokenResponse};
use crate::session::IDENTITY_KEY;

/// Leeway subtracted from the access-token expiry so a token is refreshed
/// before an upstream sees it expire mid-flight.
const EXPIRY_SKEW_SECS: i64 = 30;

/// The authenticated identity bound to a session.
///
/// Written wholesale on login and refresh, read by the token relay and the
/// logout orchestrator. Token values stay server-side; nothing here is ever
/// serialized into a response.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    /// Raw ID token, kept for `id_token_hint` on RP-initiated logout.
    pub id_token: Option<String>,
    /// Provider session-correlation claim.
    pub sid: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn from_token_response(token: &GatewayTokenResponse) -> Self {
        let id_token = token.extra_fields().id_token.clone();
        let claims = id_token
            .as_deref()
            .and_then(oidc::decode_id_claims)
            .unwrap_or_default();

        Self {
            subject: claims
                .sub
                .or(claims.preferred_username)
                .unwrap_or_else(|| "unknown".to_string()),
            sid: claims.sid,
            id_token,
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at: expires_at(token.expires_in()),
        }
    }

    /// Fold a refresh response into this identity. The provider may omit the
    /// ID token and refresh token on refresh; the previous values carry over.
    pub fn refreshed(&self, token: &GatewayTokenResponse) -> Self {
        let id_token = token
            .extra_fields()
            .id_token
            .clone()
            .or_else(|| self.id_token.clone());
        let sid = token
            .extra_fields()
            .id_token
            .as_deref()
            .and_then(oidc::decode_id_claims)
            .and_then(|claims| claims.sid)
            .or_else(|| self.sid.clone());

        Self {
            subject: self.subject.clone(),
            id_token,
            sid,
            access_token: token.access_token().secret().clone(),
            refresh_token: token
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| self.refresh_token.clone()),
            expires_at: expires_at(token.expires_in()),
        }
    }

    pub fn access_token_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now() + TimeDelta::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &self.subject)
            .field("sid", &self.sid)
            .finish_non_exhaustive()
    }
}

fn expires_at(expires_in: Option<std::time::Duration>) -> Option<DateTime<Utc>> {
    expires_in
        .and_then(|duration| TimeDelta::from_std(duration).ok())
        .map(|duration| Utc::now() + duration)
}

/// Extractor yielding the session's identity, rejecting when none is bound.
pub struct SessionIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| {
                tracing::debug!(message, "session extractor failed");
                AuthError::AuthenticationRequired
            })?;

        let identity = session
            .get::<Identity>(IDENTITY_KEY)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "could not load identity from session");
                AuthError::AuthenticationRequired
            })?;

        identity
            .map(SessionIdentity)
            .ok_or(AuthError::AuthenticationRequired)
    }
}
