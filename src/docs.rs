//! # bff-gateway Documentation
//!
//! This module provides comprehensive documentation for the gateway. It
//! serves as a central place for understanding the project's architecture,
//! components, and request flows.
//!
//! ## Overview
//!
//! bff-gateway is the sole entry point for a browser frontend. The browser
//! holds a session cookie and a CSRF token; every credential obtained from
//! the identity provider stays server-side, bound to the session, and is
//! relayed to upstream services on the browser's behalf.
//!
//! ## Architecture
//!
//! The project is organized into several modules:
//!
//! - **api**: HTTP endpoints: the login flow, the logout orchestrator, and
//!   the catch-all reverse proxy
//! - **gate**: request classification and the session-identity extractor
//! - **csrf**: the double-submit CSRF guard
//! - **oidc**: OAuth2 client plumbing and ID-token claim handling
//! - **session** / **session_storage**: session-cookie layer and store
//! - **config**: environment-driven configuration and the route table
//! - **error**: failure taxonomy and redirect rewriting
//!
//! ## Authentication Flow
//!
//! The gateway implements the standard authorization-code flow:
//!
//! 1. A request to a protected route finds no session identity
//! 2. The browser is redirected to `/oauth2/authorization`
//! 3. The gateway stores `state` and a PKCE verifier in the session and
//!    redirects to the provider's authorization endpoint
//! 4. The provider redirects back to `/oauth2/callback` with a code
//! 5. The gateway verifies `state`, exchanges the code for tokens, and binds
//!    the resulting identity to the session
//! 6. The browser is redirected to the frontend origin, now logged in
//!
//! ## Logout Flow
//!
//! `POST /logout` runs a strictly ordered sequence: capture the identity,
//! invalidate the local session, clear the `SESSION`, `XSRF-TOKEN`, and
//! `JSESSIONID` cookies, then either redirect to the provider's logout
//! endpoint (when an ID token exists) or straight back to the frontend.
//! The provider returns through `GET /logout-success`, which clears cookies
//! once more and hands the browser back to the frontend. Every step
//! tolerates failure of the previous ones; the browser always receives a
//! redirect.
//!
//! ## Deployment
//!
//! The gateway is a standalone tokio binary configured entirely from the
//! environment. See [`crate::config::Config::from_env`] for the variables.
