//! HTTP surface of the relay
//!
//! `GET /` answers with a welcome message and `POST /ask` relays a prompt,
//! either as a single JSON body or as a `text/event-stream` of framed
//! events depending on the configured [`ResponseMode`].

use crate::config::{Config, ResponseMode};
use crate::error::{ChatRelayError, Result};
use crate::providers::create_provider;
use crate::relay::{PromptRelay, PromptRequest};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Body of `GET /`
pub const WELCOME_MESSAGE: &str =
    "Welcome to the AI Chat API. Use /docs to see the API documentation.";

const EVENT_STREAM: &str = "text/event-stream";

/// Shared state of the request handlers
#[derive(Clone)]
pub struct AppState {
    /// The relay every prompt goes through
    pub relay: Arc<PromptRelay>,
    /// How `/ask` answers
    pub mode: ResponseMode,
}

impl AppState {
    /// Create handler state
    pub fn new(relay: PromptRelay, mode: ResponseMode) -> Self {
        Self {
            relay: Arc::new(relay),
            mode,
        }
    }

    fn wants_stream(&self, headers: &HeaderMap) -> bool {
        match self.mode {
            ResponseMode::Json => false,
            ResponseMode::Stream => true,
            ResponseMode::Auto => headers
                .get(ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(|accept| accept.contains(EVENT_STREAM))
                .unwrap_or(false),
        }
    }
}

/// Build the application router
///
/// # Errors
///
/// Returns `ChatRelayError::Config` if `allowed_origin` is not a valid
/// header value
pub fn router(state: AppState, allowed_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(allowed_origin).map_err(|e| {
        ChatRelayError::Config(format!(
            "Invalid allowed origin '{}': {}",
            allowed_origin, e
        ))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(root))
        .route("/ask", post(ask))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": WELCOME_MESSAGE }))
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PromptRequest>,
) -> Response {
    if !state.wants_stream(&headers) {
        return Json(state.relay.handle_prompt(&request).await).into_response();
    }

    let events = state.relay.stream_prompt(&request).await;
    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(event.frame())));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM)),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

/// Run the relay server until the process is stopped
///
/// # Errors
///
/// Returns error if the provider cannot be created or the address cannot
/// be bound
pub async fn serve(config: &Config) -> Result<()> {
    let provider = create_provider(&config.provider)?;
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        mode = %config.server.response_mode,
        "Relay configured"
    );

    let state = AppState::new(PromptRelay::new(provider), config.server.response_mode);
    let app = router(state, &config.server.allowed_origin)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatRelayError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FakeProvider;

    fn state(mode: ResponseMode) -> AppState {
        AppState::new(
            PromptRelay::new(Arc::new(FakeProvider::replying("ok"))),
            mode,
        )
    }

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_auto_mode_negotiates_on_accept() {
        let state = state(ResponseMode::Auto);
        assert!(state.wants_stream(&accept("text/event-stream, application/json")));
        assert!(!state.wants_stream(&accept("application/json")));
        assert!(!state.wants_stream(&HeaderMap::new()));
    }

    #[test]
    fn test_fixed_modes_ignore_accept() {
        assert!(!state(ResponseMode::Json).wants_stream(&accept("text/event-stream")));
        assert!(state(ResponseMode::Stream).wants_stream(&HeaderMap::new()));
    }

    #[test]
    fn test_router_rejects_invalid_origin() {
        assert!(router(state(ResponseMode::Auto), "bad\norigin").is_err());
    }
}
