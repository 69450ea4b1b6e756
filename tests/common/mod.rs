//! Shared helpers for API integration tests.
//!
//! Every test gets its own router over fresh in-memory state, so tests
//! never observe each other.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use minibank::AppState;

pub fn test_app() -> Router {
    minibank::api::create_router(AppState::new())
}

/// POST a JSON body, optionally with a session cookie.
pub async fn post_json(app: &Router, uri: &str, cookie: Option<&str>, body: Value) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// GET, optionally with a session cookie.
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Extract the `name=token` pair from a register/login response.
pub fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("response should carry a session cookie")
        .to_string()
}

/// Read the response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and return their session cookie.
pub async fn register(app: &Router, username: &str, password: &str) -> String {
    let response = post_json(
        app,
        "/api/register",
        None,
        json!({ "username": username, "password": password }),
    )
    .await;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "registration failed for {username}"
    );
    session_cookie(&response)
}
