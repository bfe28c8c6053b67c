//! In-memory storage, for tests and dry runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{DrawRecord, GameKind, IssueId};
use crate::storage::{DrawStore, GameTable, UpsertSummary};

#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<HashMap<GameKind, GameTable>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrawStore for MemoryStorage {
    async fn count(&self, game: GameKind) -> Result<usize> {
        Ok(self
            .tables
            .read()
            .await
            .get(&game)
            .map_or(0, |t| t.draws.len()))
    }

    async fn exists(&self, game: GameKind, issue: &IssueId) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .get(&game)
            .is_some_and(|t| t.contains(issue)))
    }

    async fn upsert_batch(&self, game: GameKind, records: &[DrawRecord]) -> Result<UpsertSummary> {
        let mut tables = self.tables.write().await;
        Ok(tables.entry(game).or_default().merge(game, records))
    }

    async fn latest(&self, game: GameKind) -> Result<Option<DrawRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .get(&game)
            .and_then(|t| t.latest().cloned()))
    }

    async fn oldest(&self, game: GameKind) -> Result<Option<DrawRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .get(&game)
            .and_then(|t| t.oldest().cloned()))
    }

    async fn recent(&self, game: GameKind, limit: usize) -> Result<Vec<DrawRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .get(&game)
            .map(|t| t.recent(limit))
            .unwrap_or_default())
    }
}
