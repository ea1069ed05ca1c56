//! Startup orchestration.
//!
//! Builds every subsystem from a validated config in dependency order:
//! codec, store, limiter, workflow, server.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, ServiceConfig};
use crate::http::HttpServer;
use crate::security::{RateLimiter, SlidingWindowLimiter};
use crate::store::{MemoryStore, StoreError};
use crate::token::{TokenCodec, TokenError};
use crate::workflow::UnsubscribeWorkflow;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token codec error: {0}")]
    Token(#[from] TokenError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// All long-lived parts of a running service.
pub struct Service {
    pub server: HttpServer,
    pub store: MemoryStore,
    pub limiter: Option<Arc<SlidingWindowLimiter>>,
}

/// Wire the service together from config and signing secret.
pub fn assemble(config: ServiceConfig, secret: &str) -> Result<Service, StartupError> {
    let codec = TokenCodec::new(secret)?;

    let store = match &config.store.snapshot_path {
        Some(path) => MemoryStore::load_from_file(path)?,
        None => {
            tracing::warn!("No store.snapshot_path configured; unsubscribes are kept in memory only");
            MemoryStore::new(None)
        }
    };

    let limiter = config
        .rate_limit
        .enabled
        .then(|| Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)));

    let workflow = UnsubscribeWorkflow::new(codec, Arc::new(store.clone()));
    let gate = limiter.clone().map(|l| l as Arc<dyn RateLimiter>);
    let server = HttpServer::new(config, workflow, gate);

    Ok(Service {
        server,
        store,
        limiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_defaults() {
        let service = assemble(ServiceConfig::default(), "secret").unwrap();
        assert!(service.limiter.is_some());
        assert!(service.store.snapshot().users.is_empty());
    }

    #[test]
    fn test_rate_limit_disabled() {
        let mut config = ServiceConfig::default();
        config.rate_limit.enabled = false;
        let service = assemble(config, "secret").unwrap();
        assert!(service.limiter.is_none());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = assemble(ServiceConfig::default(), "");
        assert!(matches!(result, Err(StartupError::Token(TokenError::EmptySecret))));
    }
}
