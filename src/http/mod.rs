//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → security::rate_limit (only on /unsubscribe)
//!     → handlers.rs (query parsing, workflow call)
//!     → pages.rs (outcome → HTML + status)
//!     → Send to client
//! ```

pub mod handlers;
pub mod pages;
pub mod server;

pub use pages::Page;
pub use server::{AppState, HttpServer};
