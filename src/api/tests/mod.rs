use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::config::{Config, RouteTable};
use crate::router::{create_router, AppState};
use crate::session::create_session_layer;

// Helper function to create a test configuration
fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        public_url: "http://localhost:8888".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        auth_server_url: "http://localhost:9000".to_string(),
        client_id: "gateway".to_string(),
        client_secret: "secret".to_string(),
        scopes: vec!["openid".to_string(), "email".to_string()],
        session_timeout: time::Duration::minutes(30),
        session_secret: None,
        upstream_timeout: std::time::Duration::from_secs(2),
        dev_mode: true,
        routes: RouteTable::parse(
            "orders /api/v1/orders http://localhost:59181 relay",
            "http://localhost:3000",
        )
        .expect("test route table"),
    }
}

// Helper function to create a test app
async fn test_app() -> Router {
    let state = AppState::from_config(test_config()).expect("test state");
    let session_layer = create_session_layer(&state.config, None, state.session_store.clone());

    create_router(state, session_layer)
}

// Helper function to make a test request
async fn make_request(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<String>,
    headers: Option<Vec<(String, String)>>,
) -> (StatusCode, String) {
    let mut req_builder = Request::builder().method(method).uri(uri);

    if let Some(headers) = headers {
        for (name, value) in headers {
            req_builder = req_builder.header(name, value);
        }
    }

    let body = match body {
        Some(b) => Body::from(b),
        None => Body::empty(),
    };

    let req = req_builder.body(body).unwrap();

    let response = app.oneshot(req).await.unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(body.to_vec()).unwrap();

    (status, body)
}

// Helper function to make a request and return headers
async fn make_request_with_response_headers(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<String>,
    headers: Option<Vec<(String, String)>>,
) -> (StatusCode, Vec<(String, String)>) {
    let mut req_builder = Request::builder().method(method).uri(uri);

    if let Some(headers) = headers {
        for (name, value) in headers {
            req_builder = req_builder.header(name, value);
        }
    }

    let body = match body {
        Some(b) => Body::from(b),
        None => Body::empty(),
    };

    let req = req_builder.body(body).unwrap();

    let response = app.oneshot(req).await.unwrap();

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    (status, headers)
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// Pull a cookie out of the response's Set-Cookie headers as a `name=value`
// pair suitable for a follow-up request's Cookie header.
fn cookie_pair(headers: &[(String, String)], cookie_name: &str) -> Option<String> {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
        .find(|(_, value)| value.starts_with(&format!("{cookie_name}=")))
        .and_then(|(_, value)| value.split(';').next().map(str::to_string))
}

fn cookie_cleared(headers: &[(String, String)], cookie_name: &str) -> bool {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
        .any(|(_, value)| {
            value.starts_with(&format!("{cookie_name}=")) && value.contains("Max-Age=0")
        })
}

mod routes;
