//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

use unsubscribe_service::config::ServiceConfig;
use unsubscribe_service::http::HttpServer;
use unsubscribe_service::lifecycle::Shutdown;
use unsubscribe_service::security::{RateLimiter, SlidingWindowLimiter};
use unsubscribe_service::store::{
    MemoryStore, StoreError, UnsubscribeLogEntry, UnsubscribeStore, UserRecord,
};
use unsubscribe_service::token::TokenCodec;
use unsubscribe_service::workflow::UnsubscribeWorkflow;

pub const SECRET: &str = "integration-test-secret";

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET).unwrap()
}

pub fn token_for(user_id: u64, email: &str) -> String {
    codec()
        .issue(user_id, email, chrono::Duration::days(90))
        .unwrap()
}

/// Store seeded with user 999 / test@example.com.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new(None);
    store.insert_user(UserRecord::new(999, "test@example.com"));
    store
}

/// Router over `store` with the limiter built from `config`.
pub fn router_with(config: ServiceConfig, store: Arc<dyn UnsubscribeStore>) -> Router {
    let limiter = config
        .rate_limit
        .enabled
        .then(|| Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)) as Arc<dyn RateLimiter>);
    let workflow = UnsubscribeWorkflow::new(codec(), store);
    HttpServer::new(config, workflow, limiter).router()
}

/// Router over `store` with rate limiting off.
pub fn router(store: MemoryStore) -> Router {
    let mut config = ServiceConfig::default();
    config.rate_limit.enabled = false;
    router_with(config, Arc::new(store))
}

/// Send a GET through the router in-process.
pub async fn get(router: &Router, uri: &str) -> (u16, String) {
    get_from(router, uri, "203.0.113.7").await
}

/// Send a GET as if forwarded for `client`.
pub async fn get_from(router: &Router, uri: &str, client: &str) -> (u16, String) {
    let request = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .header("user-agent", "integration-test")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    read(response).await
}

async fn read(response: Response<Body>) -> (u16, String) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Serve `config` on an ephemeral port. Returns the address and the
/// coordinator that stops it.
pub async fn spawn_server(config: ServiceConfig, store: MemoryStore) -> (SocketAddr, Shutdown) {
    let limiter = config
        .rate_limit
        .enabled
        .then(|| Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)) as Arc<dyn RateLimiter>);
    let workflow = UnsubscribeWorkflow::new(codec(), Arc::new(store));
    let server = HttpServer::new(config, workflow, limiter);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl UnsubscribeStore for BrokenStore {
    async fn find_user(&self, _user_id: u64, _email: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn mark_unsubscribed(&self, _user_id: u64, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn append_log(&self, _entry: UnsubscribeLogEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
