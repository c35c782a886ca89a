//! Retention sweep: keep the newest snapshot of a log, drop the rest.
//!
//! ```text
//! latest(log) ──► None ──► EmptyLog (nothing deleted)
//!      │
//!      └─ Some(newest) ──► delete_older_than(log, newest.created_at)
//! ```
//!
//! The read and the delete are separate store calls. A snapshot appended in
//! between has `created_at >= threshold` and survives; a writer whose clock
//! lags the threshold can still lose its snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use zsemplan_core::{Result, SnapshotStore, ZsemError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub log: String,
    pub kept_id: String,
    pub threshold: DateTime<Utc>,
    pub deleted: usize,
}

pub struct RetentionSweeper {
    store: Arc<dyn SnapshotStore>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Delete every snapshot of `log` older than its newest one. Idempotent.
    pub async fn sweep(&self, log: &str) -> Result<SweepReport> {
        let Some(newest) = self.store.latest(log).await? else {
            tracing::error!("🧹 Retention sweep of '{log}' found no snapshots");
            return Err(ZsemError::EmptyLog(log.to_string()));
        };

        let deleted = self.store.delete_older_than(log, newest.created_at).await?;
        tracing::info!(
            "🧹 Swept '{log}' on {}: kept {}, deleted {deleted}",
            self.store.name(),
            newest.id
        );
        Ok(SweepReport {
            log: log.to_string(),
            kept_id: newest.id,
            threshold: newest.created_at,
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, SnapshotDb};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use zsemplan_core::{SnapshotDocument, logs};

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 23, minute, 0).unwrap()
    }

    async fn seeded(store: &dyn SnapshotStore, log: &str, minutes: &[u32]) {
        for m in minutes {
            store.append(log, t(*m), serde_json::json!({ "m": m })).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_keeps_only_newest() {
        let store = Arc::new(SnapshotDb::open_in_memory().unwrap());
        seeded(store.as_ref(), logs::TIMETABLE, &[1, 7, 3]).await;
        let sweeper = RetentionSweeper::new(store.clone());

        let report = sweeper.sweep(logs::TIMETABLE).await.unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.threshold, t(7));

        let left = store.list(logs::TIMETABLE).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, report.kept_id);
        assert_eq!(left[0].body["m"], 7);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        seeded(store.as_ref(), logs::TEACHERS, &[1, 2]).await;
        let sweeper = RetentionSweeper::new(store.clone());

        let first = sweeper.sweep(logs::TEACHERS).await.unwrap();
        let after_first = store.list(logs::TEACHERS).await.unwrap();
        let second = sweeper.sweep(logs::TEACHERS).await.unwrap();

        assert_eq!(first.deleted, 1);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.kept_id, first.kept_id);
        assert_eq!(store.list(logs::TEACHERS).await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_empty_log_is_error_and_deletes_nothing() {
        let store = Arc::new(MemoryStore::new());
        seeded(store.as_ref(), logs::TIMETABLE, &[1, 2]).await;
        let sweeper = RetentionSweeper::new(store.clone());

        let err = sweeper.sweep(logs::SUBSTITUTIONS).await.unwrap_err();
        assert!(matches!(err, ZsemError::EmptyLog(ref log) if log == logs::SUBSTITUTIONS));
        assert_eq!(store.list(logs::TIMETABLE).await.unwrap().len(), 2);
    }

    /// Appends a newer snapshot right after the sweeper reads the newest one.
    struct RacingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl SnapshotStore for RacingStore {
        fn name(&self) -> &str {
            "racing"
        }

        async fn append(
            &self,
            log: &str,
            created_at: DateTime<Utc>,
            body: serde_json::Value,
        ) -> Result<SnapshotDocument> {
            self.inner.append(log, created_at, body).await
        }

        async fn latest(&self, log: &str) -> Result<Option<SnapshotDocument>> {
            let newest = self.inner.latest(log).await?;
            self.inner.append(log, t(30), serde_json::json!("late")).await?;
            Ok(newest)
        }

        async fn delete_older_than(&self, log: &str, threshold: DateTime<Utc>) -> Result<usize> {
            self.inner.delete_older_than(log, threshold).await
        }

        async fn list(&self, log: &str) -> Result<Vec<SnapshotDocument>> {
            self.inner.list(log).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_append_survives() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
        });
        seeded(store.as_ref(), logs::SUBSTITUTIONS, &[1, 5]).await;
        let sweeper = RetentionSweeper::new(store.clone());

        let report = sweeper.sweep(logs::SUBSTITUTIONS).await.unwrap();
        assert_eq!(report.threshold, t(5));
        assert_eq!(report.deleted, 1);

        let left: Vec<_> = store
            .list(logs::SUBSTITUTIONS)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.created_at)
            .collect();
        assert_eq!(left, vec![t(5), t(30)]);
    }
}
