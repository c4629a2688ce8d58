// src/snapshot.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

/// Last-seen normalized content for a monitored source. At most one
/// snapshot per `source_key`; replaced in place after a substantive
/// change is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub source_key: String,
    pub content: String,
    pub sha256: String,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(source_key: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let sha256 = format!("{:x}", hasher.finalize());
        Self {
            source_key: source_key.into(),
            content,
            sha256,
            taken_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `None` means the source has never been observed (or the stored
    /// record is unreadable and must be re-bootstrapped).
    async fn get(&self, source_key: &str) -> Option<Snapshot>;
    async fn put(&self, snap: Snapshot) -> Result<()>;
}

/// Durable store: one pretty-printed JSON file per source key under a
/// state directory, written via tmp-file + rename.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, source_key: &str) -> PathBuf {
        // Keys land in file names; anything outside [A-Za-z0-9._-] is mapped away.
        let safe: String = source_key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("snapshot_{safe}.json"))
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn get(&self, source_key: &str) -> Option<Snapshot> {
        let path = self.path_for(source_key);
        match fs::read_to_string(&path).await {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(snap) => Some(snap),
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "unreadable snapshot; treating as absent");
                    None
                }
            },
            Err(_) => None,
        }
    }

    async fn put(&self, snap: Snapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create state dir {}", self.dir.display()))?;
        let path = self.path_for(&snap.source_key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&snap).context("serialize snapshot")?;
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and local runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, source_key: &str) -> Option<Snapshot> {
        let map = self.inner.lock().expect("snapshot mutex poisoned");
        map.get(source_key).cloned()
    }

    async fn put(&self, snap: Snapshot) -> Result<()> {
        let mut map = self.inner.lock().expect("snapshot mutex poisoned");
        map.insert(snap.source_key.clone(), snap);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = Snapshot::new("k", "hello");
        let b = Snapshot::new("k", "hello");
        let c = Snapshot::new("k", "hello!");
        assert_eq!(a.sha256, b.sha256);
        assert_ne!(a.sha256, c.sha256);
        assert_eq!(a.sha256.len(), 64);
    }

    #[tokio::test]
    async fn memory_store_overwrites_in_place() {
        let store = MemorySnapshotStore::new();
        assert!(store.get("site").await.is_none());
        store.put(Snapshot::new("site", "v1")).await.unwrap();
        store.put(Snapshot::new("site", "v2")).await.unwrap();
        let got = store.get("site").await.unwrap();
        assert_eq!(got.content, "v2");
    }

    #[tokio::test]
    async fn file_store_roundtrips_and_survives_odd_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(tmp.path());
        let key = "https://example.com/page?id=1";
        store.put(Snapshot::new(key, "body")).await.unwrap();
        let got = store.get(key).await.unwrap();
        assert_eq!(got.content, "body");
        assert_eq!(got.source_key, key);
        assert!(store.get("other").await.is_none());
    }
}
