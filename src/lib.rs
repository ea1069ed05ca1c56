//! Signed, time-limited unsubscribe links for marketing email.
//!
//! The email sender calls [`TokenCodec::issue`] when composing a message;
//! this service verifies the token on `GET /unsubscribe`, asks the recipient
//! to confirm, and records the unsubscribe.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;
pub mod token;
pub mod workflow;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use token::TokenCodec;
pub use workflow::{Outcome, UnsubscribeWorkflow};
