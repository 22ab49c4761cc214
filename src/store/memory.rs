//! In-memory store for tests and throwaway runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::{Clock, Document, SystemClock, TasteEntry, UserRecord};
use super::traits::TasteStore;

/// In-memory taste store. Nothing survives the process.
pub struct MemoryStore {
    document: RwLock<Document>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            document: RwLock::new(Document::new()),
            clock,
        }
    }

    /// Copy of the current document.
    pub async fn snapshot(&self) -> Document {
        self.document.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TasteStore for MemoryStore {
    async fn get_or_create_user(&self, user_id: &str) -> UserRecord {
        let mut document = self.document.write().await;
        document
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::new_at(self.clock.now()))
            .clone()
    }

    async fn set_name(&self, user_id: &str, name: &str) {
        let mut document = self.document.write().await;
        document
            .entry(user_id.to_string())
            .or_default()
            .rename(name, self.clock.now());
    }

    async fn append_taste(&self, user_id: &str, taste: &str) -> bool {
        let mut document = self.document.write().await;
        match document.get_mut(user_id) {
            Some(record) => {
                record
                    .tastes
                    .push(TasteEntry::recorded_at(taste, self.clock.now()));
                true
            }
            None => false,
        }
    }

    async fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        self.document.read().await.get(user_id).cloned()
    }
}
