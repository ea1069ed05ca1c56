//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (user_id, token_prefix, operation)
//! - Full tokens and secrets are never logged
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
