//! Workflow outcome and error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;
use crate::token::TokenError;

/// The `confirm` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Absent,
    Yes,
    No,
}

impl Confirmation {
    /// `"yes"` and `"no"` are recognised; any other value counts as absent.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("yes") => Confirmation::Yes,
            Some("no") => Confirmation::No,
            _ => Confirmation::Absent,
        }
    }
}

/// Terminal state of one unsubscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoToken,
    /// Malformed token or bad signature.
    Invalid(TokenError),
    Expired,
    UserNotFound,
    AlreadyUnsubscribed { email: String },
    AwaitingConfirmation { email: String, token: String },
    Declined { email: String },
    Confirmed { email: String },
}

impl Outcome {
    /// HTTP status for the rendered page.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::NoToken | Outcome::Invalid(_) | Outcome::Expired => StatusCode::BAD_REQUEST,
            Outcome::UserNotFound => StatusCode::NOT_FOUND,
            Outcome::AlreadyUnsubscribed { .. }
            | Outcome::AwaitingConfirmation { .. }
            | Outcome::Declined { .. }
            | Outcome::Confirmed { .. } => StatusCode::OK,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NoToken => "no_token",
            Outcome::Invalid(_) => "invalid",
            Outcome::Expired => "expired",
            Outcome::UserNotFound => "user_not_found",
            Outcome::AlreadyUnsubscribed { .. } => "already_unsubscribed",
            Outcome::AwaitingConfirmation { .. } => "awaiting_confirmation",
            Outcome::Declined { .. } => "declined",
            Outcome::Confirmed { .. } => "confirmed",
        }
    }

    pub fn is_error(&self) -> bool {
        !self.status().is_success()
    }
}

impl From<TokenError> for Outcome {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Outcome::Expired,
            other => Outcome::Invalid(other),
        }
    }
}

/// Storage call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    FindUser,
    ApplyUnsubscribe,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::FindUser => "find_user",
            StorageOperation::ApplyUnsubscribe => "apply_unsubscribe",
        }
    }
}

impl std::fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side failure; never retried.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Storage failure during {operation} for user {user_id}: {source}")]
    Storage {
        operation: StorageOperation,
        user_id: u64,
        #[source]
        source: StoreError,
    },
}
