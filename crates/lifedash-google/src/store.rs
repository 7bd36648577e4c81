//! Token store: get-by-user and upsert-by-user over [`GoogleToken`] records.
//!
//! [`MemoryTokenStore`] keeps records in process. [`FileTokenStore`] keeps a
//! JSON object keyed by user id, rewritten atomically on every upsert.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lifedash_core::BoxFuture;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;
use crate::token::{GoogleToken, TokenUpdate};

/// Persistence for per-user token records.
///
/// `upsert` is a single-record write: it either fully applies the update or
/// leaves the stored record untouched. Implementations do not retry.
pub trait TokenStore: Send + Sync {
    /// Returns the user's record, or `None` if there is none.
    fn get<'a>(&'a self, user_id: &'a str)
    -> BoxFuture<'a, Result<Option<GoogleToken>, StoreError>>;

    /// Inserts or updates the user's record and returns the stored result.
    fn upsert<'a>(
        &'a self,
        user_id: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, Result<GoogleToken, StoreError>>;
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: Mutex<HashMap<String, GoogleToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `token` as-is, replacing any record for the same user.
    pub fn insert(&self, token: GoogleToken) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.user_id.clone(), token);
    }

    /// Returns a copy of the user's record without going through the trait.
    pub fn snapshot(&self, user_id: &str) -> Option<GoogleToken> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<GoogleToken>, StoreError>> {
        let record = self.snapshot(user_id);
        Box::pin(async move { Ok(record) })
    }

    fn upsert<'a>(
        &'a self,
        user_id: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, Result<GoogleToken, StoreError>> {
        let stored = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let merged = update.apply(user_id, records.remove(user_id));
            records.insert(user_id.to_string(), merged.clone());
            merged
        };
        Box::pin(async move { Ok(stored) })
    }
}

/// JSON file token store.
///
/// The file holds `{ "<user_id>": GoogleToken, ... }`. Writes go to a
/// temporary file that is renamed over the original, with `0600`
/// permissions on Unix.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, GoogleToken>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token file at {:?}", self.path);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, records: &BTreeMap<String, GoogleToken>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(records)?;
        let temp_path = self.path.with_extension("json.tmp");

        // A leftover temp file keeps its old mode; start from a fresh one.
        match tokio::fs::remove_file(&temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;
        debug!("saved {} token record(s) to {:?}", records.len(), self.path);
        Ok(())
    }

    async fn upsert_record(
        &self,
        user_id: &str,
        update: TokenUpdate,
    ) -> Result<GoogleToken, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let merged = update.apply(user_id, records.remove(user_id));
        records.insert(user_id.to_string(), merged.clone());
        self.save(&records).await?;
        Ok(merged)
    }
}

impl TokenStore for FileTokenStore {
    fn get<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<GoogleToken>, StoreError>> {
        Box::pin(async move {
            let mut records = self.load().await?;
            Ok(records.remove(user_id))
        })
    }

    fn upsert<'a>(
        &'a self,
        user_id: &'a str,
        update: TokenUpdate,
    ) -> BoxFuture<'a, Result<GoogleToken, StoreError>> {
        Box::pin(self.upsert_record(user_id, update))
    }
}
