//! Scheduler engine: tracks tasks and fires due jobs.
//!
//! ```text
//! tokio interval ──► tick(now) ──► due jobs ──► tokio::spawn(timeout(run_budget, runner(job)))
//!                                                      │
//!                                    record_outcome ◄──┘
//! ```
//!
//! Every job runs in its own task bounded by the run budget. A job still
//! running at its next firing time skips that occurrence. Nothing is retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use zsemplan_core::config::ScheduleConfig;
use zsemplan_core::{Job, Result};

use crate::tasks::{Task, TaskStatus};

pub struct SchedulerEngine {
    tasks: Vec<Task>,
    timezone: Tz,
}

impl SchedulerEngine {
    pub fn new(timezone: Tz) -> Self {
        Self {
            tasks: Vec::new(),
            timezone,
        }
    }

    /// Pipelines plus one retention sweep per configured log.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let mut engine = Self::new(config.tz()?);
        engine.add_task("timetable", Job::Timetable, &config.timetable)?;
        engine.add_task("substitutions", Job::Substitutions, &config.substitutions)?;
        engine.add_task("teachers", Job::Teachers, &config.teachers)?;
        for retention in &config.retention {
            let job = Job::Sweep {
                log: retention.log.clone(),
            };
            engine.add_task(&job.to_string(), job, &retention.cron)?;
        }
        Ok(engine)
    }

    /// Add a cron task; returns its id.
    pub fn add_task(&mut self, name: &str, job: Job, expression: &str) -> Result<String> {
        let task = Task::cron(name, job, expression, Utc::now(), self.timezone)?;
        tracing::info!(
            "📅 Task added: '{}' [{}] next run {}",
            task.name,
            task.schedule,
            task.next_run
                .map(|t| t.with_timezone(&self.timezone).to_rfc3339())
                .unwrap_or_else(|| "never".into())
        );
        let id = task.id.clone();
        self.tasks.push(task);
        Ok(id)
    }

    pub fn list_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Zone the cron expressions are evaluated in.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Mark due tasks as running and return `(task id, job)` for each one to start.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, Job)> {
        let mut due = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.is_due(now)) {
            task.next_run = task.schedule.next_after(now, self.timezone);
            if task.status == TaskStatus::Running {
                tracing::warn!("⚠️ Task '{}' still running; skipping this run", task.name);
                continue;
            }
            tracing::info!("🔔 Task triggered: '{}'", task.name);
            task.status = TaskStatus::Running;
            task.last_run = Some(now);
            task.run_count += 1;
            due.push((task.id.clone(), task.job.clone()));
        }
        due
    }

    /// Record how a started job ended.
    pub fn record_outcome(&mut self, id: &str, outcome: std::result::Result<(), String>) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.status = match outcome {
                Ok(()) => TaskStatus::Completed,
                Err(e) => TaskStatus::Failed(e),
            };
        }
    }
}

/// Run the scheduler loop forever, starting every due job through `runner`.
///
/// `runner` returns a one-line summary on success.
pub async fn spawn_scheduler<F, Fut>(
    engine: Arc<Mutex<SchedulerEngine>>,
    runner: F,
    check_interval: Duration,
    run_budget: Duration,
) where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    tracing::info!(
        "⏰ Scheduler started (check every {}s, run budget {}s)",
        check_interval.as_secs(),
        run_budget.as_secs()
    );

    let runner = Arc::new(runner);
    let mut interval = tokio::time::interval(check_interval);

    loop {
        interval.tick().await;

        let due = engine.lock().await.tick(Utc::now());

        for (id, job) in due {
            let engine = engine.clone();
            let runner = runner.clone();
            tokio::spawn(async move {
                let outcome = match tokio::time::timeout(run_budget, runner(job.clone())).await {
                    Ok(Ok(summary)) => {
                        tracing::info!("✅ {job}: {summary}");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        tracing::error!("❌ {job} failed: {e}");
                        Err(e.to_string())
                    }
                    Err(_) => {
                        tracing::error!("❌ {job} exceeded run budget of {}s", run_budget.as_secs());
                        Err("run budget exceeded".to_string())
                    }
                };
                engine.lock().await.record_outcome(&id, outcome);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsemplan_core::{ZsemError, logs};

    fn far_future() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(400)
    }

    #[test]
    fn test_from_config_defaults() {
        let engine = SchedulerEngine::from_config(&ScheduleConfig::default()).unwrap();
        assert_eq!(engine.task_count(), 6);
        assert_eq!(engine.timezone(), Tz::Europe__Warsaw);
        let jobs: Vec<_> = engine.list_tasks().iter().map(|t| t.job.clone()).collect();
        assert!(jobs.contains(&Job::Timetable));
        assert!(jobs.contains(&Job::Sweep {
            log: logs::SUBSTITUTIONS.into()
        }));
        assert!(engine.list_tasks().iter().all(|t| t.next_run.is_some()));
    }

    #[test]
    fn test_from_config_rejects_bad_cron() {
        let config = ScheduleConfig {
            teachers: "0 22 * *".into(),
            ..Default::default()
        };
        assert!(matches!(
            SchedulerEngine::from_config(&config),
            Err(ZsemError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_timezone() {
        let config = ScheduleConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(matches!(
            SchedulerEngine::from_config(&config),
            Err(ZsemError::Config(_))
        ));
    }

    #[test]
    fn test_tick_fires_and_reschedules() {
        let mut engine = SchedulerEngine::new(Tz::UTC);
        let id = engine.add_task("every minute", Job::Timetable, "* * * * *").unwrap();

        let now = far_future();
        let due = engine.tick(now);
        assert_eq!(due, vec![(id.clone(), Job::Timetable)]);

        let task = &engine.list_tasks()[0];
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.run_count, 1);
        assert_eq!(task.last_run, Some(now));
        assert!(task.next_run.is_some_and(|next| next > now));
    }

    #[test]
    fn test_running_task_skips_overlap() {
        let mut engine = SchedulerEngine::new(Tz::UTC);
        let id = engine.add_task("every minute", Job::Teachers, "* * * * *").unwrap();

        let now = far_future();
        assert_eq!(engine.tick(now).len(), 1);
        assert!(engine.tick(now + chrono::Duration::minutes(5)).is_empty());
        assert_eq!(engine.list_tasks()[0].run_count, 1);

        engine.record_outcome(&id, Err("boom".into()));
        assert_eq!(engine.list_tasks()[0].status, TaskStatus::Failed("boom".into()));
        assert_eq!(engine.tick(now + chrono::Duration::minutes(10)).len(), 1);
    }

    #[test]
    fn test_not_due_before_next_run() {
        let mut engine = SchedulerEngine::new(Tz::UTC);
        engine.add_task("yearly", Job::Teachers, "0 0 1 1 *").unwrap();
        assert!(engine.tick(Utc::now()).is_empty());
    }

    #[tokio::test]
    async fn test_loop_runs_due_job_and_records_outcome() {
        let mut engine = SchedulerEngine::new(Tz::UTC);
        let job = Job::Sweep {
            log: logs::TEACHERS.into(),
        };
        let id = engine.add_task("sweep", job.clone(), "* * * * *").unwrap();
        // Make the task due immediately.
        engine.tasks[0].next_run = Some(Utc::now() - chrono::Duration::seconds(1));
        let engine = Arc::new(Mutex::new(engine));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(spawn_scheduler(
            engine.clone(),
            move |job: Job| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(job);
                    Ok::<_, ZsemError>("done".to_string())
                }
            },
            Duration::from_millis(10),
            Duration::from_secs(1),
        ));

        let started = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(started, Some(job));

        // Let the spawned job record its outcome.
        for _ in 0..50 {
            if engine.lock().await.list_tasks()[0].status == TaskStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let engine = engine.lock().await;
        assert_eq!(engine.list_tasks()[0].id, id);
        assert_eq!(engine.list_tasks()[0].status, TaskStatus::Completed);
        handle.abort();
    }
}
