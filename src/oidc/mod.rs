//! OpenID Connect plumbing: the OAuth2 client the gateway acts through, the
//! token-response shape carrying the raw ID token, and claim extraction.

use base64::Engine;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
    RedirectUrl, StandardRevocableToken, StandardTokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use crate::config::{Config, CALLBACK_PATH};
use crate::error::GatewayInitError;

/// Provider endpoint paths, relative to the authorization-server base URL.
pub const AUTHORIZE_ENDPOINT: &str = "/oauth2/authorize";
pub const TOKEN_ENDPOINT: &str = "/oauth2/token";
pub const LOGOUT_ENDPOINT: &str = "/connect/logout";

/// Extra token-endpoint fields beyond the basic OAuth2 response. The raw ID
/// token is kept for RP-initiated logout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

pub type GatewayTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

/// OAuth2 client with the authorization and token endpoints configured.
pub type OAuthClient = Client<
    BasicErrorResponse,
    GatewayTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Build the OAuth2 client from gateway configuration.
pub fn build_client(config: &Config) -> Result<OAuthClient, GatewayInitError> {
    let client = Client::new(ClientId::new(config.client_id.clone()))
        .set_client_secret(ClientSecret::new(config.client_secret.clone()))
        .set_auth_uri(
            AuthUrl::new(format!("{}{}", config.auth_server_url, AUTHORIZE_ENDPOINT))
                .map_err(|source| GatewayInitError::OAuthEndpoint { source })?,
        )
        .set_token_uri(
            TokenUrl::new(format!("{}{}", config.auth_server_url, TOKEN_ENDPOINT))
                .map_err(|source| GatewayInitError::OAuthEndpoint { source })?,
        )
        .set_redirect_uri(
            RedirectUrl::new(format!("{}{}", config.public_url, CALLBACK_PATH))
                .map_err(|source| GatewayInitError::OAuthEndpoint { source })?,
        );

    Ok(client)
}

/// Claims the gateway reads out of an ID token.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdClaims {
    pub sub: Option<String>,
    /// Provider session identifier, used to target RP-initiated logout.
    pub sid: Option<String>,
    pub preferred_username: Option<String>,
}

/// Decode the payload segment of an ID token.
///
/// The token comes straight from the provider's token-endpoint response over
/// the configured channel, so the signature is not re-verified here.
pub fn decode_id_claims(id_token: &str) -> Option<IdClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
pub(crate) fn encode_test_id_token(claims: &serde_json::Value) -> String {
    let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.{}",
        engine.encode(br#"{"alg":"none"}"#),
        engine.encode(claims.to_string().as_bytes()),
        engine.encode(b"sig")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_reads_sub_and_sid() {
        let token = encode_test_id_token(&json!({
            "sub": "user-1",
            "sid": "provider-session-1",
            "preferred_username": "alice",
        }));

        let claims = decode_id_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.sid.as_deref(), Some("provider-session-1"));
        assert_eq!(claims.preferred_username.as_deref(), Some("alice"));
    }

    #[test]
    fn decode_tolerates_missing_claims() {
        let token = encode_test_id_token(&json!({ "sub": "user-1" }));

        let claims = decode_id_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert!(claims.sid.is_none());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_id_claims("not-a-jwt").is_none());
        assert!(decode_id_claims("a.!!!.c").is_none());
    }
}
