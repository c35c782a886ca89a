//! SQLite-backed snapshot logs.
//! Survives restarts; every log shares one table keyed by log name.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use zsemplan_core::{Result, SnapshotDocument, SnapshotStore, ZsemError, truncate_to_millis};

fn storage_err(e: impl std::fmt::Display) -> ZsemError {
    ZsemError::Storage(e.to_string())
}

pub struct SnapshotDb {
    conn: Mutex<Connection>,
}

impl SnapshotDb {
    /// Open or create the snapshot database, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| storage_err(format!("DB open: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| storage_err(format!("WAL: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        tracing::info!("💾 Snapshot DB opened: {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(storage_err)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                id TEXT PRIMARY KEY,
                log TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                body TEXT NOT NULL              -- JSON document body
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_log_created
                ON snapshots (log, created_at_ms);
            ",
        )
        .map_err(|e| storage_err(format!("Migration: {e}")))
    }

    /// Number of documents in a log.
    pub fn count(&self, log: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(storage_err)?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM snapshots WHERE log = ?1",
                params![log],
                |r| r.get(0),
            )
            .map_err(storage_err)?;
        Ok(n as usize)
    }
}

type Row = (String, String, i64, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_document((id, log, created_at_ms, body): Row) -> Result<SnapshotDocument> {
    let created_at = DateTime::from_timestamp_millis(created_at_ms)
        .ok_or_else(|| storage_err(format!("Bad timestamp {created_at_ms} on {id}")))?;
    Ok(SnapshotDocument {
        id,
        log,
        created_at,
        body: serde_json::from_str(&body)?,
    })
}

#[async_trait]
impl SnapshotStore for SnapshotDb {
    fn name(&self) -> &str {
        "sqlite"
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
        let conn = self.conn.lock().map_err(storage_err)?;
        conn.execute(
            "INSERT INTO snapshots (id, log, created_at_ms, body) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.id,
                document.log,
                document.created_at.timestamp_millis(),
                document.body.to_string(),
            ],
        )
        .map_err(storage_err)?;
        Ok(document)
    }

    async fn latest(&self, log: &str) -> Result<Option<SnapshotDocument>> {
        let row = {
            let conn = self.conn.lock().map_err(storage_err)?;
            conn.query_row(
                "SELECT id, log, created_at_ms, body FROM snapshots
                 WHERE log = ?1 ORDER BY created_at_ms DESC, rowid DESC LIMIT 1",
                params![log],
                read_row,
            )
            .optional()
            .map_err(storage_err)?
        };
        row.map(into_document).transpose()
    }

    async fn delete_older_than(&self, log: &str, threshold: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().map_err(storage_err)?;
        conn.execute(
            "DELETE FROM snapshots WHERE log = ?1 AND created_at_ms < ?2",
            params![log, threshold.timestamp_millis()],
        )
        .map_err(storage_err)
    }

    async fn list(&self, log: &str) -> Result<Vec<SnapshotDocument>> {
        let rows = {
            let conn = self.conn.lock().map_err(storage_err)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, log, created_at_ms, body FROM snapshots
                     WHERE log = ?1 ORDER BY created_at_ms ASC, rowid ASC",
                )
                .map_err(storage_err)?;
            stmt.query_map(params![log], read_row)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<Row>>>()
                .map_err(storage_err)?
        };
        rows.into_iter().map(into_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use zsemplan_core::logs;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_latest() {
        let db = SnapshotDb::open_in_memory().unwrap();
        assert!(db.latest(logs::TIMETABLE).await.unwrap().is_none());

        db.append(logs::TIMETABLE, t(0), serde_json::json!({"n": 0})).await.unwrap();
        let newest = db
            .append(logs::TIMETABLE, t(5), serde_json::json!({"n": 1}))
            .await
            .unwrap();
        db.append(logs::TEACHERS, t(9), serde_json::json!({})).await.unwrap();

        let latest = db.latest(logs::TIMETABLE).await.unwrap().unwrap();
        assert_eq!(latest, newest);
        assert_eq!(latest.body["n"], 1);
        assert_eq!(db.count(logs::TIMETABLE).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_created_at_kept_to_millis() {
        let db = SnapshotDb::open_in_memory().unwrap();
        let ts = t(0) + Duration::microseconds(1_234_567);
        let doc = db.append(logs::SUBSTITUTIONS, ts, serde_json::json!({})).await.unwrap();
        assert_eq!(doc.created_at, t(0) + Duration::milliseconds(1_234));
        let listed = db.list(logs::SUBSTITUTIONS).await.unwrap();
        assert_eq!(listed, vec![doc]);
    }

    #[tokio::test]
    async fn test_delete_is_strict_and_per_log() {
        let db = SnapshotDb::open_in_memory().unwrap();
        for minute in [0, 1, 2] {
            db.append(logs::TEACHERS, t(minute), serde_json::json!({})).await.unwrap();
        }
        db.append(logs::TIMETABLE, t(0), serde_json::json!({})).await.unwrap();

        let deleted = db.delete_older_than(logs::TEACHERS, t(1)).await.unwrap();
        assert_eq!(deleted, 1);
        let remaining: Vec<_> = db
            .list(logs::TEACHERS)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.created_at)
            .collect();
        assert_eq!(remaining, vec![t(1), t(2)]);
        assert_eq!(db.count(logs::TIMETABLE).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_documents() {
        let path = std::env::temp_dir().join(format!("zsemplan-{}.db", uuid::Uuid::new_v4()));
        {
            let db = SnapshotDb::open(&path).unwrap();
            db.append(logs::TIMETABLE, t(3), serde_json::json!({"k": "v"})).await.unwrap();
        }
        let db = SnapshotDb::open(&path).unwrap();
        let latest = db.latest(logs::TIMETABLE).await.unwrap().unwrap();
        assert_eq!(latest.body["k"], "v");
        drop(db);
        let _ = std::fs::remove_file(&path);
    }
}
