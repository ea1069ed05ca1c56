//! Stored record types and error definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A mailing-list recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub unsubscribed: bool,
    #[serde(default)]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// A subscribed user.
    pub fn new(id: u64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            unsubscribed: false,
            unsubscribed_at: None,
        }
    }
}

/// Audit record of one completed unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeLogEntry {
    pub id: Uuid,
    pub user_id: u64,
    pub email: String,
    pub token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A token that completed an unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedToken {
    pub user_id: u64,
    pub token: String,
    pub used_at: DateTime<Utc>,
}

/// On-disk representation of a `MemoryStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub users: Vec<UserRecord>,
    pub log: Vec<UnsubscribeLogEntry>,
    pub used_tokens: Vec<UsedToken>,
}

/// Errors that can occur in a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Mutation targeted a user that does not exist.
    #[error("User {0} does not exist")]
    UserMissing(u64),

    /// Backend is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
