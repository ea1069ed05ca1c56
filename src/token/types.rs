//! Token types and error definitions.

use thiserror::Error;

/// Identity carried by a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: u64,
    pub email: String,
    /// Expiry as epoch milliseconds.
    pub expires_at: i64,
}

/// Errors produced while issuing or verifying a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not base64url, not UTF-8, wrong field count or unparsable fields.
    #[error("Invalid token format")]
    Malformed,

    /// Authentic token whose expiry has passed.
    #[error("Token expired")]
    Expired,

    /// Signature does not match the recomputed HMAC.
    #[error("Invalid signature")]
    BadSignature,

    /// Email cannot be embedded in a token.
    #[error("Email {0:?} cannot be used in an unsubscribe token")]
    InvalidEmail(String),

    /// HMAC key is empty.
    #[error("Signing secret must not be empty")]
    EmptySecret,
}

impl TokenError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::Expired => "expired",
            TokenError::BadSignature => "bad_signature",
            TokenError::InvalidEmail(_) => "invalid_email",
            TokenError::EmptySecret => "empty_secret",
        }
    }
}
