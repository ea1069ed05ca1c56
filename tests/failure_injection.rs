//! Failure injection: storage faults and rate limiting.

use std::sync::Arc;
use unsubscribe_service::config::ServiceConfig;

mod common;

#[tokio::test]
async fn test_storage_failure_renders_server_error() {
    let mut config = ServiceConfig::default();
    config.rate_limit.enabled = false;
    let router = common::router_with(config, Arc::new(common::BrokenStore));
    let token = common::token_for(999, "test@example.com");

    for suffix in ["", "&confirm=yes", "&confirm=no"] {
        let (status, body) = common::get(&router, &format!("/unsubscribe?token={token}{suffix}")).await;
        assert_eq!(status, 500);
        assert!(body.contains("Server Error"));
        assert!(body.contains("Please try again later."));
    }
}

#[tokio::test]
async fn test_token_errors_do_not_reach_storage() {
    let mut config = ServiceConfig::default();
    config.rate_limit.enabled = false;
    let router = common::router_with(config, Arc::new(common::BrokenStore));

    let (status, _) = common::get(&router, "/unsubscribe?token=garbage").await;
    assert_eq!(status, 400);
    let (status, _) = common::get(&router, "/unsubscribe").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_eleventh_request_is_rate_limited() {
    let store = common::seeded_store();
    let router = common::router_with(ServiceConfig::default(), Arc::new(store.clone()));
    let token = common::token_for(999, "test@example.com");
    let uri = format!("/unsubscribe?token={token}");

    for i in 0..10 {
        let (status, _) = common::get_from(&router, &uri, "198.51.100.1").await;
        assert_eq!(status, 200, "request {} should pass", i + 1);
    }

    let (status, body) = common::get_from(&router, &uri, "198.51.100.1").await;
    assert_eq!(status, 429);
    assert!(body.contains("Too Many Requests"));

    // Other clients keep their own window.
    let (status, _) = common::get_from(&router, &uri, "198.51.100.2").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_rate_limited_confirmation_does_not_mutate() {
    let mut config = ServiceConfig::default();
    config.rate_limit.max_requests = 1;
    let store = common::seeded_store();
    let router = common::router_with(config, Arc::new(store.clone()));
    let token = common::token_for(999, "test@example.com");

    let (status, _) = common::get_from(&router, &format!("/unsubscribe?token={token}"), "198.51.100.9").await;
    assert_eq!(status, 200);

    let (status, _) =
        common::get_from(&router, &format!("/unsubscribe?token={token}&confirm=yes"), "198.51.100.9").await;
    assert_eq!(status, 429);
    assert!(!store.user(999).unwrap().unsubscribed);
    assert!(store.log_entries().is_empty());
}

#[tokio::test]
async fn test_forwarded_for_uses_first_hop() {
    let mut config = ServiceConfig::default();
    config.rate_limit.max_requests = 1;
    let router = common::router_with(config, Arc::new(common::seeded_store()));

    let (status, _) = common::get_from(&router, "/unsubscribe", "192.0.2.10, 10.0.0.1").await;
    assert_eq!(status, 400);
    let (status, _) = common::get_from(&router, "/unsubscribe", "192.0.2.10, 10.0.0.2").await;
    assert_eq!(status, 429);
}

#[tokio::test]
async fn test_health_is_never_rate_limited() {
    let mut config = ServiceConfig::default();
    config.rate_limit.max_requests = 1;
    let router = common::router_with(config, Arc::new(common::seeded_store()));

    for _ in 0..5 {
        let (status, _) = common::get_from(&router, "/health", "198.51.100.3").await;
        assert_eq!(status, 200);
    }
}
