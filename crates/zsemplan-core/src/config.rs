//! zsemplan configuration system.
//!
//! Loaded from `~/.zsemplan/config.toml`; every field has a default so a
//! missing file or a partial file is always usable.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ZsemError};
use crate::types::logs;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZsemConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub substitutions: SubstitutionsConfig,
    #[serde(default)]
    pub teachers: TeachersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl ZsemConfig {
    /// Load config from the default path (~/.zsemplan/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ZsemError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ZsemError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(ZsemError::Config("source.base_url must not be empty".into()));
        }
        if self.fetch.max_in_flight == 0 {
            return Err(ZsemError::Config("fetch.max_in_flight must be at least 1".into()));
        }
        if self.substitutions.days == 0 {
            return Err(ZsemError::Config("substitutions.days must be at least 1".into()));
        }
        if self.teachers.first_id > self.teachers.last_id {
            return Err(ZsemError::Config(format!(
                "teachers.first_id ({}) is greater than teachers.last_id ({})",
                self.teachers.first_id, self.teachers.last_id
            )));
        }
        self.schedule.tz()?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the zsemplan home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zsemplan")
    }
}

/// Where the school pages live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timetable_path")]
    pub timetable_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String { "https://zsem.edu.pl".into() }
fn default_timetable_path() -> String { "/plany/plany/o21.html".into() }
fn default_user_agent() -> String { concat!("zsemplan/", env!("CARGO_PKG_VERSION")).into() }
fn default_request_timeout() -> u64 { 15 }

impl SourceConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timetable_url(&self) -> String {
        format!("{}{}", self.base(), self.timetable_path)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timetable_path: default_timetable_path(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// CSS selectors describing the page layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_timetable_table")]
    pub timetable_table: String,
    #[serde(default = "default_time_cell")]
    pub time_cell: String,
    #[serde(default = "default_lesson_name")]
    pub lesson_name: String,
    #[serde(default = "default_teacher_link")]
    pub teacher_link: String,
    #[serde(default = "default_room_link")]
    pub room_link: String,
    #[serde(default = "default_teacher_title")]
    pub teacher_title: String,
}

fn default_timetable_table() -> String { "table.tabela".into() }
fn default_time_cell() -> String { "td.g".into() }
fn default_lesson_name() -> String { "span.p".into() }
fn default_teacher_link() -> String { "a.n".into() }
fn default_room_link() -> String { "a.s".into() }
fn default_teacher_title() -> String { "span.tytulnapis".into() }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            timetable_table: default_timetable_table(),
            time_cell: default_time_cell(),
            lesson_name: default_lesson_name(),
            teacher_link: default_teacher_link(),
            room_link: default_room_link(),
            teacher_title: default_teacher_title(),
        }
    }
}

/// Substitution pages are behind Basic auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 { 7 }

impl Default for SubstitutionsConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            days: default_days(),
        }
    }
}

/// Range of staff page ids fetched by the directory pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachersConfig {
    #[serde(default = "default_first_id")]
    pub first_id: u32,
    #[serde(default = "default_last_id")]
    pub last_id: u32,
}

fn default_first_id() -> u32 { 1 }
fn default_last_id() -> u32 { 99 }

impl Default for TeachersConfig {
    fn default() -> Self {
        Self {
            first_id: default_first_id(),
            last_id: default_last_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

fn default_max_in_flight() -> usize { 8 }
fn default_deadline() -> u64 { 20 }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            deadline_secs: default_deadline(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String { "~/.zsemplan/snapshots.db".into() }

impl StorageConfig {
    /// Database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

/// Cron schedules (5-field, evaluated in `timezone`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA zone name, e.g. `Europe/Warsaw`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_run_budget")]
    pub run_budget_secs: u64,
    #[serde(default = "default_timetable_cron")]
    pub timetable: String,
    #[serde(default = "default_substitutions_cron")]
    pub substitutions: String,
    #[serde(default = "default_teachers_cron")]
    pub teachers: String,
    #[serde(default = "default_retention")]
    pub retention: Vec<RetentionSchedule>,
}

/// One retention sweep target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionSchedule {
    pub log: String,
    pub cron: String,
}

fn default_timezone() -> String { "Europe/Warsaw".into() }
fn default_check_interval() -> u64 { 30 }
fn default_run_budget() -> u64 { 24 }
fn default_timetable_cron() -> String { "0 23,7,16 * * 1-5".into() }
fn default_substitutions_cron() -> String { "*/30 6-16 * * 1-5".into() }
fn default_teachers_cron() -> String { "0 22 * * 0".into() }
fn default_retention() -> Vec<RetentionSchedule> {
    [
        (logs::TIMETABLE, "30 23 * * *"),
        (logs::SUBSTITUTIONS, "35 23 * * *"),
        (logs::TEACHERS, "40 23 * * *"),
    ]
    .into_iter()
    .map(|(log, cron)| RetentionSchedule { log: log.into(), cron: cron.into() })
    .collect()
}

impl ScheduleConfig {
    /// Parsed `timezone`.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ZsemError::Config(format!("schedule.timezone: {e}")))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            check_interval_secs: default_check_interval(),
            run_budget_secs: default_run_budget(),
            timetable: default_timetable_cron(),
            substitutions: default_substitutions_cron(),
            teachers: default_teachers_cron(),
            retention: default_retention(),
        }
    }
}
