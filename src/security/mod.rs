//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /unsubscribe request:
//!     → rate_limit.rs (derive client id, check sliding window)
//!     → 429 page, or pass to the unsubscribe handler
//! ```
//!
//! # Design Decisions
//! - The limiter is injected behind a trait, never a process-wide singleton
//! - Rejected requests are not recorded in the window
//! - Windows live in process memory and reset on restart; instances do not
//!   share state without a shared backing store

pub mod rate_limit;

pub use rate_limit::{client_id, rate_limit_middleware, RateLimiter, SlidingWindowLimiter};
