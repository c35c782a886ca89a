//! In-process snapshot logs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zsemplan_core::{Result, SnapshotDocument, SnapshotStore, ZsemError, truncate_to_millis};

/// Logs held in a map, each kept sorted by `created_at` (stable for ties).
#[derive(Default)]
pub struct MemoryStore {
    logs: Mutex<HashMap<String, Vec<SnapshotDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<SnapshotDocument>>>> {
        self.logs
            .lock()
            .map_err(|e| ZsemError::Storage(e.to_string()))
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(
        &self,
        log: &str,
        created_at: DateTime<Utc>,
        body: serde_json::Value,
    ) -> Result<SnapshotDocument> {
        let document = SnapshotDocument {
            id: uuid::Uuid::new_v4().to_string(),
            log: log.to_string(),
            created_at: truncate_to_millis(created_at),
            body,
        };
        let mut logs = self.lock()?;
        let entries = logs.entry(log.to_string()).or_default();
        let at = entries.partition_point(|d| d.created_at <= document.created_at);
        entries.insert(at, document.clone());
        Ok(document)
    }

    async fn latest(&self, log: &str) -> Result<Option<SnapshotDocument>> {
        Ok(self.lock()?.get(log).and_then(|entries| entries.last().cloned()))
    }

    async fn delete_older_than(&self, log: &str, threshold: DateTime<Utc>) -> Result<usize> {
        let mut logs = self.lock()?;
        let Some(entries) = logs.get_mut(log) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|d| d.created_at >= threshold);
        Ok(before - entries.len())
    }

    async fn list(&self, log: &str) -> Result<Vec<SnapshotDocument>> {
        Ok(self.lock()?.get(log).cloned().unwrap_or_default())
    }
}
