//! Persistence collaborator for the unsubscribe workflow.
//!
//! # Data Flow
//! ```text
//! workflow
//!     → find_user (read-only lookup by id + email)
//!     → apply_unsubscribe (flag user, then append audit log)
//!     → mark_token_used (audit only)
//! ```
//!
//! # Design Decisions
//! - The workflow only sees the `UnsubscribeStore` trait; backends are swappable
//! - The user mutation always lands before the log write
//! - The log is append-only; entries are never mutated or deleted

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use types::{StoreError, StoreSnapshot, UnsubscribeLogEntry, UsedToken, UserRecord};

/// Storage operations consumed by the unsubscribe workflow.
#[async_trait]
pub trait UnsubscribeStore: Send + Sync {
    /// Look up a user by id and email. Both must match.
    async fn find_user(&self, user_id: u64, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Flag a user as unsubscribed at `at`.
    async fn mark_unsubscribed(&self, user_id: u64, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Append an audit entry.
    async fn append_log(&self, entry: UnsubscribeLogEntry) -> Result<(), StoreError>;

    /// Record that a token completed an unsubscribe.
    async fn mark_token_used(
        &self,
        _user_id: u64,
        _token: &str,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    /// Flag the user and append the audit entry as one logical unit.
    ///
    /// Backends with transactions should override this. The default orders
    /// the mutation before the log write.
    async fn apply_unsubscribe(
        &self,
        user_id: u64,
        at: DateTime<Utc>,
        entry: UnsubscribeLogEntry,
    ) -> Result<(), StoreError> {
        self.mark_unsubscribed(user_id, at).await?;
        self.append_log(entry).await
    }
}
