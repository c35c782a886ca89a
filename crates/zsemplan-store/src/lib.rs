//! # zsemplan store
//!
//! Snapshot logs behind [`zsemplan_core::SnapshotStore`]:
//! - `SnapshotDb`: SQLite, one table for every log
//! - `MemoryStore`: in-process, for tests and dry runs
//! - `RetentionSweeper`: keeps only the newest snapshot of a log

pub mod memory;
pub mod retention;
pub mod sqlite;

pub use memory::MemoryStore;
pub use retention::{RetentionSweeper, SweepReport};
pub use sqlite::SnapshotDb;
