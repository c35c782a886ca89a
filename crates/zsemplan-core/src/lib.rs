//! # zsemplan core
//!
//! Shared data model, configuration, error type and the storage seam used by
//! every other crate in the workspace.
//!
//! ```text
//! scheduler ─► pipeline ─┬─► scrape (fetch + parse)
//!                        └─► SnapshotStore (append / latest / delete_older_than)
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ZsemConfig;
pub use error::{Result, ZsemError};
pub use traits::SnapshotStore;
pub use types::*;
