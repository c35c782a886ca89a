//! Storage seam: every pipeline and the retention sweeper receive a store explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::SnapshotDocument;

/// Named append-only snapshot logs.
///
/// Logs are created implicitly by the first `append`. Documents are never
/// updated; they leave a log only through `delete_older_than`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Append a document; returns it as stored (id assigned, `created_at` at store precision).
    async fn append(
        &self,
        log: &str,
        created_at: DateTime<Utc>,
        body: serde_json::Value,
    ) -> Result<SnapshotDocument>;

    /// Newest document by `created_at`, if any.
    async fn latest(&self, log: &str) -> Result<Option<SnapshotDocument>>;

    /// Delete every document with `created_at` strictly less than `threshold`.
    /// Returns the number of deleted documents.
    async fn delete_older_than(&self, log: &str, threshold: DateTime<Utc>) -> Result<usize>;

    /// All documents of a log, oldest first.
    async fn list(&self, log: &str) -> Result<Vec<SnapshotDocument>>;
}
