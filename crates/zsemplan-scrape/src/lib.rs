//! # zsemplan scrape
//!
//! Turns school pages into structured records.
//!
//! ```text
//! FetchRequest[] ──fan_out──► FetchedPage ──Document::parse──► parser ──► records
//!                 (capped, ordered,          (scraper)          ├── TimetableGridBuilder
//!                  deadline-bounded)                            ├── parse_substitutions
//!                                                               └── TeacherDirectoryExtractor
//! ```

pub mod document;
pub mod fetch;
pub mod http;
pub mod substitutions;
pub mod teachers;
pub mod timetable;

pub use document::Document;
pub use fetch::{FanOutOptions, FetchError, FetchRequest, FetchedPage, PageFetcher, StaticFetcher, fan_out};
pub use http::{HttpFetcher, basic_auth_header};
pub use substitutions::parse_substitutions;
pub use teachers::TeacherDirectoryExtractor;
pub use timetable::TimetableGridBuilder;
