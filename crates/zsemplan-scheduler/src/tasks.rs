//! Scheduled tasks: one job bound to one cron schedule.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use zsemplan_core::{Job, Result};

use crate::cron::CronSchedule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    /// Human-readable name, used in logs.
    pub name: String,
    pub job: Job,
    pub schedule: CronSchedule,
    pub status: TaskStatus,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u32,
}

impl Task {
    /// Create a task whose first run is the next match after `now`.
    pub fn cron(
        name: &str,
        job: Job,
        expression: &str,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<Self> {
        let schedule = CronSchedule::parse(expression)?;
        let next_run = schedule.next_after(now, tz);
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            job,
            schedule,
            status: TaskStatus::Pending,
            last_run: None,
            next_run,
            run_count: 0,
        })
    }

    /// Check if this task should run at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| now >= next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_first_run_computed() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 5, 0).unwrap();
        let task = Task::cron("hourly", Job::Timetable, "0 * * * *", now, Tz::UTC).unwrap();
        assert_eq!(task.next_run, Some(Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap()));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.is_due(now));
        assert!(task.is_due(Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap()));
    }

    #[test]
    fn test_never_firing_schedule_never_due() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 5, 0).unwrap();
        let task = Task::cron("feb30", Job::Teachers, "0 0 30 2 *", now, Tz::UTC).unwrap();
        assert_eq!(task.next_run, None);
        assert!(!task.is_due(now + chrono::Duration::days(400)));
    }

    #[test]
    fn test_invalid_expression_rejected() {
        assert!(Task::cron("bad", Job::Timetable, "0 25 * * *", Utc::now(), Tz::UTC).is_err());
    }
}
