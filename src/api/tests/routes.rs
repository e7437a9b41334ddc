use super::*;
use crate::config::{AUTHORIZATION_PATH, AUTH_ERROR_HEADER, ERROR_PATH, SESSION_COOKIE};

#[tokio::test]
async fn test_login_page_accessible() {
    let app = test_app().await;

    let (status, body) = make_request(app, Method::GET, "/login", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/oauth2/authorization"));
}

#[tokio::test]
async fn test_error_page_accessible() {
    let app = test_app().await;

    let (status, _) = make_request(app, Method::GET, "/error", None, None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_navigation_enters_login_flow() {
    let app = test_app().await;

    let (status, headers) =
        make_request_with_response_headers(app, Method::GET, "/api/v1/orders/1", None, None).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(header_value(&headers, "location"), Some(AUTHORIZATION_PATH));
}

#[tokio::test]
async fn test_mutating_request_without_csrf_is_rejected() {
    let app = test_app().await;

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::POST,
        "/api/v1/orders",
        Some("{}".to_string()),
        None,
    )
    .await;

    // Rejected before routing: no redirect, no upstream call.
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        header_value(&headers, AUTH_ERROR_HEADER),
        Some("csrf-rejected")
    );
}

#[tokio::test]
async fn test_mutating_request_with_mismatched_csrf_is_rejected() {
    let app = test_app().await;

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::POST,
        "/api/v1/orders",
        None,
        Some(vec![
            ("cookie".to_string(), "XSRF-TOKEN=token-a".to_string()),
            ("x-xsrf-token".to_string(), "token-b".to_string()),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        header_value(&headers, AUTH_ERROR_HEADER),
        Some("csrf-rejected")
    );
}

#[tokio::test]
async fn test_unauthenticated_mutation_with_csrf_pair_is_rejected_not_redirected() {
    let app = test_app().await;

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::POST,
        "/api/v1/orders",
        None,
        Some(vec![
            ("cookie".to_string(), "XSRF-TOKEN=token-a".to_string()),
            ("x-xsrf-token".to_string(), "token-a".to_string()),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        header_value(&headers, AUTH_ERROR_HEADER),
        Some("authentication-rejected")
    );
}

#[tokio::test]
async fn test_preflight_is_not_gated() {
    let app = test_app().await;

    let (status, _) =
        make_request_with_response_headers(app, Method::OPTIONS, "/api/v1/orders", None, None)
            .await;

    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert_ne!(status, StatusCode::FORBIDDEN);
    assert_ne!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn test_authorize_redirects_to_provider_and_establishes_session() {
    let app = test_app().await;

    let (status, headers) =
        make_request_with_response_headers(app, Method::GET, "/oauth2/authorization", None, None)
            .await;

    assert_eq!(status, StatusCode::FOUND);

    let location = header_value(&headers, "location").unwrap();
    assert!(location.starts_with("http://localhost:9000/oauth2/authorize?"));
    assert!(location.contains("state="));
    assert!(location.contains("code_challenge="));
    assert!(location.contains("client_id=gateway"));

    // The response that establishes the session also carries the CSRF token,
    // both as a readable cookie and mirrored into the response header.
    assert!(cookie_pair(&headers, SESSION_COOKIE).is_some());
    assert!(cookie_pair(&headers, "XSRF-TOKEN").is_some());
    assert!(header_value(&headers, "x-xsrf-token").is_some());
}

#[tokio::test]
async fn test_callback_with_mismatched_state_fails() {
    let app = test_app().await;

    // Enter the flow first so a state value is pending in the session.
    let (_, headers) = make_request_with_response_headers(
        app.clone(),
        Method::GET,
        "/oauth2/authorization",
        None,
        None,
    )
    .await;
    let session_cookie = cookie_pair(&headers, SESSION_COOKIE).unwrap();

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::GET,
        "/oauth2/callback?code=valid-code&state=forged-state",
        None,
        Some(vec![("cookie".to_string(), session_cookie)]),
    )
    .await;

    // Never authenticated, regardless of the code: the flow fails closed.
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(header_value(&headers, "location"), Some(ERROR_PATH));
}

#[tokio::test]
async fn test_callback_without_pending_request_fails() {
    let app = test_app().await;

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::GET,
        "/oauth2/callback?code=abc&state=xyz",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(header_value(&headers, "location"), Some(ERROR_PATH));
}

#[tokio::test]
async fn test_callback_with_provider_error_fails() {
    let app = test_app().await;

    let (status, headers) = make_request_with_response_headers(
        app,
        Method::GET,
        "/oauth2/callback?error=access_denied",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(header_value(&headers, "location"), Some(ERROR_PATH));
}
