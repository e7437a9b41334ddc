use http::Method;

/// Outcome of classifying one inbound request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateDecision {
    /// Let the request through to routing.
    Permit,
    /// No usable identity; send the browser into the authorization-code flow.
    RequireAuthentication,
    /// No usable identity and a redirect would not help the caller.
    Reject,
}

/// Paths reachable without a session: the login surface, the logout pair,
/// the error page, and the frontend root.
const PUBLIC_PATHS: [&str; 6] = [
    "/",
    "/login",
    "/logout",
    "/logout-success",
    "/error",
    "/favicon.ico",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || path == "/oauth2" || path.starts_with("/oauth2/")
}

/// Classify a request. Pure; consulted on every request.
///
/// Preflight requests and the public allow-list always pass. Protected paths
/// pass only with an authenticated session; otherwise navigations are routed
/// into the login flow and state-changing requests are rejected outright,
/// since a provider redirect is useless to a `fetch()` call.
pub fn classify(method: &Method, path: &str, authenticated: bool) -> GateDecision {
    if method == Method::OPTIONS || is_public_path(path) {
        return GateDecision::Permit;
    }

    if authenticated {
        return GateDecision::Permit;
    }

    if matches!(*method, Method::GET | Method::HEAD) {
        GateDecision::RequireAuthentication
    } else {
        GateDecision::Reject
    }
}
