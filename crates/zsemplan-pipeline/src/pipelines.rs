//! The three scrape pipelines and the retention job.
//!
//! ```text
//! timetable      1 URL  ──► fan_out ──► TimetableGridBuilder ──► TimeTableData
//! substitutions  7 URLs ──► fan_out ──► parse_substitutions  ──► substitutions
//! teachers       N URLs ──► fan_out ──► TeacherDirectory...  ──► teachers
//! sweep:<log>                          RetentionSweeper      ──► log
//! ```
//!
//! A run returns only after its snapshot write has been acknowledged.
//! Item failures become `null` slots; only a failed timetable fetch aborts a run.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use zsemplan_core::{
    DaySubstitutions, Job, Result, SnapshotDocument, SnapshotStore, SubstitutionBatch,
    TeacherDirectorySnapshot, ZsemConfig, ZsemError, logs,
};
use zsemplan_scrape::{
    Document, FanOutOptions, FetchError, FetchRequest, FetchedPage, PageFetcher,
    TeacherDirectoryExtractor, TimetableGridBuilder, basic_auth_header, fan_out, parse_substitutions,
};
use zsemplan_store::{RetentionSweeper, SweepReport};

use crate::urls::{local_date, substitution_urls, teacher_id_offset, teacher_urls};

pub struct Pipelines {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn SnapshotStore>,
    config: ZsemConfig,
    options: FanOutOptions,
    timezone: Tz,
    grid: TimetableGridBuilder,
    directory: TeacherDirectoryExtractor,
    sweeper: RetentionSweeper,
}

impl Pipelines {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn SnapshotStore>,
        config: ZsemConfig,
    ) -> Result<Self> {
        Ok(Self {
            grid: TimetableGridBuilder::new(&config.layout)?,
            directory: TeacherDirectoryExtractor::new(
                &config.layout,
                teacher_id_offset(&config.source),
            )?,
            options: FanOutOptions::from(&config.fetch),
            timezone: config.schedule.tz()?,
            sweeper: RetentionSweeper::new(store.clone()),
            fetcher,
            store,
            config,
        })
    }

    /// Run one scheduled job and describe the outcome in one line.
    pub async fn run(&self, job: Job) -> Result<String> {
        tracing::info!("▶️ Running {job}");
        match job {
            Job::Timetable => {
                let doc = self.run_timetable().await?;
                Ok(format!("snapshot {} written to {}", doc.id, doc.log))
            }
            Job::Substitutions => {
                let today = local_date(Utc::now(), self.timezone);
                let doc = self.run_substitutions(today).await?;
                Ok(format!("snapshot {} written to {}", doc.id, doc.log))
            }
            Job::Teachers => {
                let doc = self.run_teachers().await?;
                Ok(format!("snapshot {} written to {}", doc.id, doc.log))
            }
            Job::Sweep { log } => {
                let report = self.sweep(&log).await?;
                Ok(format!("kept {}, deleted {}", report.kept_id, report.deleted))
            }
        }
    }

    /// Fetch the class timetable and append it to `TimeTableData`.
    pub async fn run_timetable(&self) -> Result<SnapshotDocument> {
        let url = self.config.source.timetable_url();
        let page = fan_out(
            self.fetcher.as_ref(),
            &[FetchRequest::get(&url)],
            self.options,
            |page: FetchedPage| Ok(page),
        )
        .await
        .into_iter()
        .next()
        .unwrap_or_else(|| Err(FetchError::DeadlineExceeded { url: url.clone() }))
        .map_err(|e| ZsemError::Http(e.to_string()))?;

        let snapshot = self.grid.build(&Document::parse(&page.body), Utc::now());
        tracing::info!(
            "📅 Timetable: {} class-groups x {} time slots",
            snapshot.columns.len(),
            snapshot.times.len()
        );
        self.write(logs::TIMETABLE, snapshot.captured_at, snapshot.to_document_body()?)
            .await
    }

    /// Fetch `substitutions.days` days of substitutions starting at `today`.
    pub async fn run_substitutions(&self, today: NaiveDate) -> Result<SnapshotDocument> {
        let settings = &self.config.substitutions;
        let (name, value) = basic_auth_header(&settings.username, &settings.password);
        let urls = substitution_urls(&self.config.source, today, settings.days);
        let requests: Vec<FetchRequest> = urls
            .iter()
            .map(|url| FetchRequest::get(url).with_header(&name, &value))
            .collect();

        let results = fan_out(self.fetcher.as_ref(), &requests, self.options, |page| {
            Ok(parse_substitutions(&Document::parse(&page.body)))
        })
        .await;

        let batch = SubstitutionBatch {
            days: urls
                .into_iter()
                .zip(results)
                .map(|(url, records)| DaySubstitutions {
                    url,
                    records: records.ok(),
                })
                .collect(),
            captured_at: Utc::now(),
        };
        tracing::info!(
            "🔁 Substitutions: {} days, {} failed",
            batch.days.len(),
            batch.failed_days()
        );
        self.write(logs::SUBSTITUTIONS, batch.captured_at, batch.to_document_body()?)
            .await
    }

    /// Fetch every staff page and append the directory to `teachers`.
    pub async fn run_teachers(&self) -> Result<SnapshotDocument> {
        let requests: Vec<FetchRequest> = teacher_urls(&self.config.source, &self.config.teachers)
            .into_iter()
            .map(FetchRequest::get)
            .collect();

        let results = fan_out(self.fetcher.as_ref(), &requests, self.options, |page| {
            Ok(self
                .directory
                .extract(&Document::parse(&page.body), &page.requested_url))
        })
        .await;

        let snapshot = TeacherDirectorySnapshot {
            teachers: results.into_iter().map(std::result::Result::ok).collect(),
            captured_at: Utc::now(),
        };
        tracing::info!(
            "👩‍🏫 Teachers: {} of {} pages",
            snapshot.found(),
            snapshot.teachers.len()
        );
        self.write(logs::TEACHERS, snapshot.captured_at, snapshot.to_document_body()?)
            .await
    }

    pub async fn sweep(&self, log: &str) -> Result<SweepReport> {
        self.sweeper.sweep(log).await
    }

    async fn write(
        &self,
        log: &str,
        created_at: chrono::DateTime<Utc>,
        body: serde_json::Value,
    ) -> Result<SnapshotDocument> {
        let doc = self.store.append(log, created_at, body).await?;
        tracing::info!("💾 {} → {} ({})", doc.id, log, self.store.name());
        Ok(doc)
    }
}
