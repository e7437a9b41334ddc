//! Request authorization gate.
//!
//! Every inbound request is classified before it can reach a handler:
//! public and preflight traffic passes, authenticated traffic passes, and
//! everything else is either sent into the login flow or rejected.

mod decision;
mod identity;

pub use decision::{classify, is_public_path, GateDecision};
pub use identity::{Identity, SessionIdentity};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

use crate::error::AuthError;
use crate::session::IDENTITY_KEY;

/// Middleware applying [`classify`] to every request.
///
/// The decision is pure; this layer only supplies its inputs and maps the
/// outcome onto responses. `RequireAuthentication` surfaces as a tagged 401
/// that the outer error pass rewrites into the flow-entry redirect.
pub async fn authorization_gate(session: Session, req: Request, next: Next) -> Response {
    let authenticated = match session.get::<Identity>(IDENTITY_KEY).await {
        Ok(identity) => identity.is_some(),
        Err(err) => {
            tracing::warn!(error = %err, "session load failed; treating request as unauthenticated");
            false
        }
    };

    match classify(req.method(), req.uri().path(), authenticated) {
        GateDecision::Permit => next.run(req).await,
        GateDecision::RequireAuthentication => AuthError::AuthenticationRequired.into_response(),
        GateDecision::Reject => AuthError::AuthenticationRejected.into_response(),
    }
}
