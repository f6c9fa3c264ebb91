//! HTTP surface tests driving the axum router directly
//!
//! Requests go through `tower::ServiceExt::oneshot`, so no socket is bound.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use chatrelay::config::ResponseMode;
use chatrelay::providers::{FakeBehavior, FakeProvider};

mod common;
use common::{test_router, ALLOWED_ORIGIN};

fn ask_request(prompt: &str, accept: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/ask")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    builder
        .body(Body::from(
            serde_json::json!({ "prompt": prompt }).to_string(),
        ))
        .expect("valid request")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn test_root_returns_welcome_message() {
    let app = test_router(FakeProvider::replying("unused"), ResponseMode::Auto);

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        json["message"],
        "Welcome to the AI Chat API. Use /docs to see the API documentation."
    );
}

#[tokio::test]
async fn test_ask_json_from_provider() {
    let app = test_router(FakeProvider::replying("Rust is great"), ResponseMode::Auto);

    let response = app
        .oneshot(ask_request("tell me about rust", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["response"], "Rust is great");
    assert_eq!(json["source"], "provider");
}

#[tokio::test]
async fn test_ask_json_fallback_when_provider_unavailable() {
    let app = test_router(
        FakeProvider::unavailable("connection refused"),
        ResponseMode::Json,
    );

    let response = app.oneshot(ask_request("hello there", None)).await.unwrap();

    // Provider failures are never surfaced as HTTP errors
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        json["response"],
        "Hello! I'm currently in fallback mode. How can I help you?"
    );
    assert_eq!(json["source"], "fallback");
}

#[tokio::test]
async fn test_ask_json_empty_answer_sentinel() {
    let app = test_router(
        FakeProvider::new(FakeBehavior::Reply(None)),
        ResponseMode::Json,
    );

    let response = app.oneshot(ask_request("anything", None)).await.unwrap();

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["response"], "No response generated");
    assert_eq!(json["source"], "provider");
}

#[tokio::test]
async fn test_ask_stream_negotiated_by_accept() {
    let app = test_router(
        FakeProvider::streaming(["Hi", " there", "!"]),
        ResponseMode::Auto,
    );

    let response = app
        .oneshot(ask_request("hello", Some("text/event-stream")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(
        body_string(response).await,
        "data: {\"content\":\"Hi\"}\n\n\
         data: {\"content\":\" there\"}\n\n\
         data: {\"content\":\"!\"}\n\n\
         data: {\"done\":true}\n\n"
    );
}

#[tokio::test]
async fn test_ask_stream_mode_ignores_accept() {
    let app = test_router(FakeProvider::streaming(["ok"]), ResponseMode::Stream);

    let response = app
        .oneshot(ask_request("x", Some("application/json")))
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_ask_stream_fallback_when_provider_unavailable() {
    let app = test_router(FakeProvider::unavailable("down"), ResponseMode::Stream);

    let response = app.oneshot(ask_request("hi", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        "data: {\"content\":\"Hello! I'm currently in fallback mode. How can I help you?\"}\n\n\
         data: {\"done\":true}\n\n"
    );
}

#[tokio::test]
async fn test_ask_stream_error_event_without_done() {
    let app = test_router(
        FakeProvider::new(FakeBehavior::FailMidStream(
            vec!["partial".to_string()],
            "upstream reset".to_string(),
        )),
        ResponseMode::Stream,
    );

    let response = app.oneshot(ask_request("x", None)).await.unwrap();
    let body = body_string(response).await;

    assert!(body.starts_with("data: {\"content\":\"partial\"}\n\n"));
    assert!(body.contains("\"error\""));
    assert!(body.contains("upstream reset"));
    assert!(!body.contains("\"done\""));
}

#[tokio::test]
async fn test_ask_rejects_malformed_body() {
    let app = test_router(FakeProvider::replying("unused"), ResponseMode::Auto);

    let request = Request::post("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"question\": 1}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = test_router(FakeProvider::replying("unused"), ResponseMode::Auto);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/ask")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("GET"));
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_cors_other_origin_not_echoed() {
    let app = test_router(FakeProvider::replying("ok"), ResponseMode::Json);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Only the configured origin is ever advertised
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
}
