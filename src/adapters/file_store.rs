//! File-backed durable store.
//!
//! One pretty-printed JSON file per key:
//!
//! ```text
//! ~/.questmap/cache/
//! └── <key>.json     # last known snapshot
//! ```
//!
//! Writes go to a temp file in the same directory and are renamed into
//! place, so a crash mid-write never leaves a truncated snapshot behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::DurableStore;
use crate::domain::Snapshot;

/// Durable store writing JSON files under a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let path = self.key_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

        Ok(Some(snapshot))
    }

    async fn set(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;

        let content = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        let dir = self.dir.clone();
        let path = self.key_path(key);

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
            tmp.write_all(content.as_bytes())
                .context("Failed to write snapshot")?;
            tmp.persist(&path)
                .with_context(|| format!("Failed to persist snapshot: {}", path.display()))?;
            Ok(())
        })
        .await
        .context("Snapshot write task failed")?
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove snapshot: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn snapshot(language: &str) -> Snapshot {
        Snapshot::new(language, Vec::new(), Vec::new(), Utc::now())
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("cache"));

        assert!(store.get("content").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("cache"));
        let original = snapshot("ko");

        store.set("content", &original).await.unwrap();
        let loaded = store.get("content").await.unwrap().unwrap();

        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        store.set("content", &snapshot("en")).await.unwrap();
        store.set("content", &snapshot("ja")).await.unwrap();

        let loaded = store.get("content").await.unwrap().unwrap();
        assert_eq!(loaded.language, "ja");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        store.set("content", &snapshot("en")).await.unwrap();
        store.remove("content").await.unwrap();
        store.remove("content").await.unwrap();

        assert!(store.get("content").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        std::fs::write(store.key_path("content"), "{ not json").unwrap();

        assert!(store.get("content").await.is_err());
    }

    #[test]
    fn test_key_path_is_sanitized() {
        let store = FileStore::new("/tmp/cache");
        assert_eq!(
            store.key_path("../evil key"),
            PathBuf::from("/tmp/cache/___evil_key.json")
        );
    }
}
