//! In-process store used for local runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{StoredRow, TransactionRecord};
use crate::ports::{CategorySource, StoreResult, TransactionStore};

use super::DEFAULT_CATEGORIES;

#[derive(Debug, Default)]
pub struct MemoryStore {
    categories: RwLock<Vec<String>>,
    rows: RwLock<Vec<StoredRow>>,
}

impl MemoryStore {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories: RwLock::new(categories),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Store seeded with the default category list.
    pub fn with_default_categories() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|(name, _)| name.to_string()).collect())
    }

    /// Inserts a raw row, bypassing record validation.
    pub async fn push_row(&self, row: StoredRow) {
        self.rows.write().await.push(row);
    }

    /// All rows in insertion order.
    pub async fn rows(&self) -> Vec<StoredRow> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl CategorySource for MemoryStore {
    async fn categories(&self) -> StoreResult<Vec<String>> {
        Ok(self.categories.read().await.clone())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn append(&self, record: &TransactionRecord) -> StoreResult<()> {
        self.rows.write().await.push(record.to_row());
        Ok(())
    }

    async fn list(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<StoredRow>> {
        let mut rows: Vec<StoredRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.owner_id == owner_id)
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(limit);
        Ok(rows)
    }
}
