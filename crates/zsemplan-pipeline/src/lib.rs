//! # zsemplan pipeline
//!
//! Fetch → parse → assemble → write for each scheduled job.

pub mod pipelines;
pub mod urls;

pub use pipelines::Pipelines;
pub use urls::{substitution_urls, teacher_urls};
