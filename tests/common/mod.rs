use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use chatrelay::config::ResponseMode;
use chatrelay::providers::FakeProvider;
use chatrelay::relay::PromptRelay;
use chatrelay::server::{router, AppState};
use chatrelay::storage::FileStore;

#[allow(dead_code)]
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[allow(dead_code)]
pub fn create_temp_store() -> (FileStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = FileStore::new(tmp.path().join("history")).expect("failed to create file store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Router over a fake provider
#[allow(dead_code)]
pub fn test_router(provider: FakeProvider, mode: ResponseMode) -> axum::Router {
    let state = AppState::new(PromptRelay::new(Arc::new(provider)), mode);
    router(state, ALLOWED_ORIGIN).expect("valid router")
}

/// Serve a router on an ephemeral local port and return its base URL
#[allow(dead_code)]
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    format!("http://{}", addr)
}

/// Build an event-stream body from raw event payloads
#[allow(dead_code)]
pub fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {}\n\n", p))
        .collect()
}
