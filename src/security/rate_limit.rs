//! Per-client sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::http::pages;
use crate::observability::metrics;

/// Header carrying the original client address behind a load balancer.
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Decides whether a client may make another request.
pub trait RateLimiter: Send + Sync {
    /// Returns `true` and records the request when the client is under its limit.
    fn allow(&self, client_id: &str) -> bool;
}

/// Sliding-window limiter: at most `max_requests` per `window` per client.
///
/// Timestamps older than the window are pruned lazily on each check.
pub struct SlidingWindowLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests as usize,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Check `client_id` as if the request arrived at `now`.
    pub fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let requests = windows.entry(client_id.to_string()).or_default();
        while let Some(&oldest) = requests.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.max_requests {
            return false;
        }
        requests.push_back(now);
        true
    }

    /// Drop clients whose windows are empty as of `now`.
    pub fn prune(&self, now: Instant) {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        windows.retain(|_, requests| {
            requests.retain(|&t| now.saturating_duration_since(t) < self.window);
            !requests.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now())
    }
}

/// Identify the client: first `X-Forwarded-For` hop, then the peer address.
pub fn client_id(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware gating a route behind the injected limiter.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<dyn RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_id(&request);

    if limiter.allow(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        pages::too_many_requests().into_response()
    }
}
