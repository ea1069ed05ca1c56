//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, rate limit)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{PageConfig, ServiceConfig};
use crate::http::handlers;
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::workflow::UnsubscribeWorkflow;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<UnsubscribeWorkflow>,
    pub pages: Arc<PageConfig>,
}

/// HTTP server for the unsubscribe endpoint.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `limiter` gates `/unsubscribe`; pass `None` to serve without one.
    pub fn new(
        config: ServiceConfig,
        workflow: UnsubscribeWorkflow,
        limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        let state = AppState {
            workflow: Arc::new(workflow),
            pages: Arc::new(config.pages.clone()),
        };

        let router = Self::build_router(&config, state, limiter);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ServiceConfig,
        state: AppState,
        limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Router {
        let mut unsubscribe = Router::new().route("/unsubscribe", get(handlers::unsubscribe));
        if let Some(limiter) = limiter {
            unsubscribe =
                unsubscribe.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        Router::new()
            .route("/health", get(handlers::health))
            .merge(unsubscribe)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
