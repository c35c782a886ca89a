//! # zsemplan scheduler
//!
//! Fires pipeline runs and retention sweeps on cron schedules.
//!
//! ```text
//! SchedulerEngine (tokio interval)
//!   ├── timetable      "0 23,7,16 * * 1-5"
//!   ├── substitutions  "*/30 6-16 * * 1-5"
//!   ├── teachers       "0 22 * * 0"
//!   └── sweep:<log>    one per retention target
//! ```

pub mod cron;
pub mod engine;
pub mod tasks;

pub use cron::CronSchedule;
pub use engine::{SchedulerEngine, spawn_scheduler};
pub use tasks::{Task, TaskStatus};
