//! Local filesystem storage implementation.
//!
//! One JSON document per game, rewritten atomically on every batch.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── draws/
//!     └── {game}.json       # GameTable: next_seq + draws
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId};
use crate::storage::{DrawStore, GameTable, UpsertSummary};

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn table_key(game: GameKind) -> String {
        format!("draws/{}.json", game.code())
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_table(&self, game: GameKind) -> Result<GameTable> {
        let key = Self::table_key(game);
        self.read_json(&key)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| AppError::storage(format!("Failed to load {key}: {e}")))
    }
}

#[async_trait]
impl DrawStore for LocalStorage {
    async fn count(&self, game: GameKind) -> Result<usize> {
        Ok(self.load_table(game).await?.draws.len())
    }

    async fn exists(&self, game: GameKind, issue: &IssueId) -> Result<bool> {
        Ok(self.load_table(game).await?.contains(issue))
    }

    async fn upsert_batch(&self, game: GameKind, records: &[DrawRecord]) -> Result<UpsertSummary> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load_table(game).await?;
        let summary = table.merge(game, records);

        if summary.inserted > 0 {
            let key = Self::table_key(game);
            self.write_json(&key, &table)
                .await
                .map_err(|e| AppError::storage(format!("Failed to write {key}: {e}")))?;
        }
        log::info!(
            "[{}] stored {} new draws, skipped {} ({} total)",
            game,
            summary.inserted,
            summary.skipped,
            table.draws.len()
        );
        Ok(summary)
    }

    async fn latest(&self, game: GameKind) -> Result<Option<DrawRecord>> {
        Ok(self.load_table(game).await?.latest().cloned())
    }

    async fn oldest(&self, game: GameKind) -> Result<Option<DrawRecord>> {
        Ok(self.load_table(game).await?.oldest().cloned())
    }

    async fn recent(&self, game: GameKind, limit: usize) -> Result<Vec<DrawRecord>> {
        Ok(self.load_table(game).await?.recent(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ssq_record;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_store() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.count(GameKind::Ssq).await.unwrap(), 0);
        assert!(storage.latest(GameKind::Ssq).await.unwrap().is_none());
        assert!(storage.recent(GameKind::Ssq, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_draw_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let record = ssq_record("2024150", 7);
        storage
            .upsert_batch(GameKind::Ssq, std::slice::from_ref(&record))
            .await
            .unwrap();

        let latest = storage.latest(GameKind::Ssq).await.unwrap().unwrap();
        assert_eq!(latest.issue, record.issue);
        assert_eq!(latest.draw_date, record.draw_date);
        assert_eq!(latest.sorted_key, record.sorted_key);

        let table: GameTable = storage.read_json("draws/ssq.json").await.unwrap().unwrap();
        assert_eq!(table.draws.len(), 1);
        assert_eq!(table.draws[0].seq, 0);
        assert_eq!(table.next_seq, 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_table() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .upsert_batch(GameKind::Ssq, &[ssq_record("2024150", 1)])
            .await
            .unwrap();
        std::fs::create_dir_all(tmp.path().join("draws/ssq.tmp")).unwrap();

        let batch = vec![ssq_record("2024151", 2), ssq_record("2024152", 3)];
        let err = storage.upsert_batch(GameKind::Ssq, &batch).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(storage.count(GameKind::Ssq).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let batch = vec![
            ssq_record("2024151", 1),
            ssq_record("2024150", 2),
            ssq_record("2024152", 3),
        ];

        let first = storage.upsert_batch(GameKind::Ssq, &batch).await.unwrap();
        assert_eq!(first, UpsertSummary { inserted: 3, skipped: 0 });

        let second = storage.upsert_batch(GameKind::Ssq, &batch).await.unwrap();
        assert_eq!(second, UpsertSummary { inserted: 0, skipped: 3 });

        assert_eq!(storage.count(GameKind::Ssq).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        LocalStorage::new(tmp.path())
            .upsert_batch(GameKind::Ssq, &[ssq_record("2024150", 4)])
            .await
            .unwrap();

        let reopened = LocalStorage::new(tmp.path());
        let issue = IssueId::normalize("2024150").unwrap();
        assert!(reopened.exists(GameKind::Ssq, &issue).await.unwrap());
        assert!(!reopened.exists(GameKind::Dlt, &issue).await.unwrap());
        assert!(tmp.path().join("draws/ssq.json").exists());
        assert!(!tmp.path().join("draws/ssq.tmp").exists());
    }

    #[tokio::test]
    async fn test_aggregates_use_recent_window() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let batch: Vec<_> = (1..=5)
            .map(|i| ssq_record(&format!("2024{i:03}"), i as u8))
            .collect();
        storage.upsert_batch(GameKind::Ssq, &batch).await.unwrap();

        let combos = storage
            .historical_combinations(GameKind::Ssq, 2)
            .await
            .unwrap();
        assert_eq!(combos.len(), 2);
        assert!(combos.contains(&batch[4].sorted_key));
        assert!(!combos.contains(&batch[0].sorted_key));

        let freq = storage.frequency(GameKind::Ssq, 3).await.unwrap();
        assert_eq!(freq.window, 3);

        let oldest = storage.oldest(GameKind::Ssq).await.unwrap().unwrap();
        assert_eq!(oldest.issue.as_str(), "2024001");
    }

    #[tokio::test]
    async fn test_corrupt_table_is_storage_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes("draws/ssq.json", b"{not json").await.unwrap();
        let err = storage.count(GameKind::Ssq).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
