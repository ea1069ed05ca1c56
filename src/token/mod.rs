//! Signed unsubscribe token subsystem.
//!
//! # Data Flow
//! ```text
//! Email sender:
//!     (user_id, email, ttl)
//!     → codec.rs builds "user_id:email:expires_at"
//!     → HMAC-SHA256 over the payload, lowercase hex
//!     → base64url (no padding) of "payload:signature"
//!
//! Unsubscribe request:
//!     token
//!     → codec.rs decodes and splits into 4 fields
//!     → recompute HMAC, constant-time compare
//!     → check expiry
//!     → VerifiedToken { user_id, email }
//! ```
//!
//! # Design Decisions
//! - Tokens are stateless and self-verifying; no server-side table is needed
//!   to check authenticity
//! - The algorithm is fixed (HMAC-SHA256), there is no key rotation
//! - Emails containing the field delimiter are refused at issuance

pub mod codec;
pub mod types;

pub use codec::TokenCodec;
pub use types::{TokenError, VerifiedToken};
