//! Durable log store interface and local backends.
//!
//! The production store is an external collaborator; the backends here
//! exist for tests (`InMemoryLogStore`) and local runs (`JsonlLogStore`).

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;

use coppertail_core::error::PersistenceError;

use crate::model::InvocationRecord;

/// The external durable log store.
#[async_trait]
pub trait LogStore: Send + Sync {
    fn name(&self) -> &str;

    /// Persist one record. Callers treat failures as best-effort.
    async fn put(&self, record: InvocationRecord) -> Result<(), PersistenceError>;
}

/// A log store that keeps records in process memory.
#[derive(Default)]
pub struct InMemoryLogStore {
    records: RwLock<Vec<InvocationRecord>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far, in write order.
    pub async fn records(&self) -> Vec<InvocationRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn put(&self, record: InvocationRecord) -> Result<(), PersistenceError> {
        self.records.write().await.push(record);
        Ok(())
    }
}

/// A log store appending one JSON line per record to a local file.
pub struct JsonlLogStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl LogStore for JsonlLogStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn put(&self, record: InvocationRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(&record)
            .map_err(|e| PersistenceError::Store(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PersistenceError::Store(e.to_string()))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, line.as_bytes())
            .await
            .map_err(|e| PersistenceError::Store(e.to_string()))
    }
}
