//! In-process store with optional JSON snapshot persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::types::{StoreError, StoreSnapshot, UnsubscribeLogEntry, UsedToken, UserRecord};
use crate::store::UnsubscribeStore;

/// A thread-safe store for users, the unsubscribe log and used tokens.
///
/// When a snapshot path is set, every mutation is first written to that
/// file and only then applied in memory. Writes are serialized and replace
/// the file atomically.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<u64, UserRecord>>,
    log: Arc<Mutex<Vec<UnsubscribeLogEntry>>>,
    used_tokens: Arc<DashMap<String, UsedToken>>,
    writes: Arc<Mutex<()>>,
    persistence_path: Option<PathBuf>,
}

/// One pending change, staged on a snapshot before it is committed.
enum Mutation {
    Unsubscribe {
        user_id: u64,
        at: DateTime<Utc>,
        entry: Option<UnsubscribeLogEntry>,
    },
    Log(UnsubscribeLogEntry),
    TokenUsed(UsedToken),
}

impl Mutation {
    fn stage(&self, snapshot: &mut StoreSnapshot) {
        match self {
            Mutation::Unsubscribe { user_id, at, entry } => {
                if let Some(user) = snapshot.users.iter_mut().find(|u| u.id == *user_id) {
                    user.unsubscribed = true;
                    user.unsubscribed_at = Some(*at);
                }
                snapshot.log.extend(entry.iter().cloned());
            }
            Mutation::Log(entry) => snapshot.log.push(entry.clone()),
            Mutation::TokenUsed(used) => {
                snapshot.used_tokens.retain(|t| t.token != used.token);
                snapshot.used_tokens.push(used.clone());
            }
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            persistence_path,
            ..Default::default()
        }
    }

    /// Load from a snapshot file if it exists; later mutations are saved back to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;
            store.restore(snapshot);
            tracing::info!(
                path = %path.display(),
                users = store.users.len(),
                log_entries = store.lock_log().len(),
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Write the current state to the snapshot file, if one is configured.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _writes = self.lock_writes();
        write_snapshot(path, &self.snapshot())
    }

    /// Insert or replace a user.
    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    /// Get a user by id.
    pub fn user(&self, user_id: u64) -> Option<UserRecord> {
        self.users.get(&user_id).map(|r| r.value().clone())
    }

    /// All audit entries in insertion order.
    pub fn log_entries(&self) -> Vec<UnsubscribeLogEntry> {
        self.lock_log().clone()
    }

    /// Whether the token has completed an unsubscribe.
    pub fn is_token_used(&self, token: &str) -> bool {
        self.used_tokens.contains_key(token)
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut users: Vec<UserRecord> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        let mut used_tokens: Vec<UsedToken> =
            self.used_tokens.iter().map(|r| r.value().clone()).collect();
        used_tokens.sort_by_key(|t| t.used_at);

        StoreSnapshot {
            users,
            log: self.log_entries(),
            used_tokens,
        }
    }

    fn restore(&self, snapshot: StoreSnapshot) {
        for user in snapshot.users {
            self.users.insert(user.id, user);
        }
        self.lock_log().extend(snapshot.log);
        for used in snapshot.used_tokens {
            self.used_tokens.insert(used.token.clone(), used);
        }
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<UnsubscribeLogEntry>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist `mutation` on top of the current state, then apply it in memory.
    ///
    /// Holds the write lock throughout, so snapshots never go backwards and a
    /// failed write leaves memory untouched.
    fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        let _writes = self.lock_writes();

        if let Mutation::Unsubscribe { user_id, .. } = &mutation {
            if !self.users.contains_key(user_id) {
                return Err(StoreError::UserMissing(*user_id));
            }
        }

        if let Some(path) = &self.persistence_path {
            let mut snapshot = self.snapshot();
            mutation.stage(&mut snapshot);
            write_snapshot(path, &snapshot)?;
        }

        match mutation {
            Mutation::Unsubscribe { user_id, at, entry } => {
                if let Some(mut user) = self.users.get_mut(&user_id) {
                    user.unsubscribed = true;
                    user.unsubscribed_at = Some(at);
                }
                self.lock_log().extend(entry);
            }
            Mutation::Log(entry) => self.lock_log().push(entry),
            Mutation::TokenUsed(used) => {
                self.used_tokens.insert(used.token.clone(), used);
            }
        }
        Ok(())
    }

    /// Run `commit` on the blocking pool.
    async fn commit_blocking(&self, mutation: Mutation) -> Result<(), StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.commit(mutation))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store write task failed: {e}")))?
    }
}

/// Write `snapshot` to a sibling temp file and rename it over `path`.
fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), users = snapshot.users.len(), "Saved store snapshot");
    Ok(())
}

#[async_trait]
impl UnsubscribeStore for MemoryStore {
    async fn find_user(&self, user_id: u64, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .get(&user_id)
            .filter(|r| r.value().email == email)
            .map(|r| r.value().clone()))
    }

    async fn mark_unsubscribed(&self, user_id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.commit_blocking(Mutation::Unsubscribe {
            user_id,
            at,
            entry: None,
        })
        .await
    }

    async fn append_log(&self, entry: UnsubscribeLogEntry) -> Result<(), StoreError> {
        self.commit_blocking(Mutation::Log(entry)).await
    }

    async fn mark_token_used(
        &self,
        user_id: u64,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.commit_blocking(Mutation::TokenUsed(UsedToken {
            user_id,
            token: token.to_string(),
            used_at: at,
        }))
        .await
    }

    async fn apply_unsubscribe(
        &self,
        user_id: u64,
        at: DateTime<Utc>,
        entry: UnsubscribeLogEntry,
    ) -> Result<(), StoreError> {
        self.commit_blocking(Mutation::Unsubscribe {
            user_id,
            at,
            entry: Some(entry),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(user_id: u64, email: &str) -> UnsubscribeLogEntry {
        UnsubscribeLogEntry {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_string(),
            token: "tok".to_string(),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_user_requires_matching_email() {
        let store = MemoryStore::new(None);
        store.insert_user(UserRecord::new(1, "a@example.com"));

        assert!(store.find_user(1, "a@example.com").await.unwrap().is_some());
        assert!(store.find_user(1, "b@example.com").await.unwrap().is_none());
        assert!(store.find_user(2, "a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_unsubscribe() {
        let store = MemoryStore::new(None);
        store.insert_user(UserRecord::new(1, "a@example.com"));
        let at = Utc::now();

        store.apply_unsubscribe(1, at, entry(1, "a@example.com")).await.unwrap();

        let user = store.user(1).unwrap();
        assert!(user.unsubscribed);
        assert_eq!(user.unsubscribed_at, Some(at));
        assert_eq!(store.log_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_logged() {
        let store = MemoryStore::new(None);
        let result = store.apply_unsubscribe(9, Utc::now(), entry(9, "x@example.com")).await;

        assert!(matches!(result, Err(StoreError::UserMissing(9))));
        assert!(store.log_entries().is_empty());
    }

    #[tokio::test]
    async fn test_mark_token_used() {
        let store = MemoryStore::new(None);
        assert!(!store.is_token_used("tok"));
        store.mark_token_used(1, "tok", Utc::now()).await.unwrap();
        assert!(store.is_token_used("tok"));
    }

    #[tokio::test]
    async fn test_persistence() {
        let path = std::env::temp_dir().join(format!("unsub_store_{}.json", Uuid::new_v4()));

        let store = MemoryStore::new(Some(path.clone()));
        store.insert_user(UserRecord::new(1, "a@example.com"));
        store.insert_user(UserRecord::new(2, "b@example.com"));
        store.apply_unsubscribe(2, Utc::now(), entry(2, "b@example.com")).await.unwrap();
        store.mark_token_used(2, "tok", Utc::now()).await.unwrap();

        let loaded = MemoryStore::load_from_file(&path).unwrap();
        assert!(!loaded.user(1).unwrap().unsubscribed);
        assert!(loaded.user(2).unwrap().unsubscribed);
        assert_eq!(loaded.log_entries().len(), 1);
        assert!(loaded.is_token_used("tok"));

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_unsubscribes_survive_reload() {
        let path = std::env::temp_dir().join(format!("unsub_concurrent_{}.json", Uuid::new_v4()));
        let store = MemoryStore::new(Some(path.clone()));
        for id in 0..40 {
            store.insert_user(UserRecord::new(id, format!("u{id}@example.com")));
        }

        let mut tasks = Vec::new();
        for id in 0..40u64 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let email = format!("u{id}@example.com");
                store.apply_unsubscribe(id, Utc::now(), entry(id, &email)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let loaded = MemoryStore::load_from_file(&path).unwrap();
        let snapshot = loaded.snapshot();
        assert_eq!(snapshot.users.len(), 40);
        assert!(snapshot.users.iter().all(|u| u.unsubscribed));
        assert_eq!(snapshot.log.len(), 40);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_user_subscribed() {
        // A regular file cannot act as a directory, so every write fails.
        let blocker = std::env::temp_dir().join(format!("unsub_blocker_{}", Uuid::new_v4()));
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = MemoryStore::new(Some(blocker.join("store.json")));
        store.insert_user(UserRecord::new(1, "a@example.com"));

        let result = store.apply_unsubscribe(1, Utc::now(), entry(1, "a@example.com")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!store.user(1).unwrap().unsubscribed);
        assert!(store.log_entries().is_empty());

        assert!(store.mark_token_used(1, "tok", Utc::now()).await.is_err());
        assert!(!store.is_token_used("tok"));

        std::fs::remove_file(&blocker).unwrap_or_default();
    }

    #[test]
    fn test_missing_snapshot_starts_empty() {
        let path = std::env::temp_dir().join(format!("unsub_missing_{}.json", Uuid::new_v4()));
        let store = MemoryStore::load_from_file(&path).unwrap();
        assert!(store.snapshot().users.is_empty());
        assert!(!path.exists());
    }
}
