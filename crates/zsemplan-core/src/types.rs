//! Data model shared by parsers, pipelines and stores.
//!
//! Field names on the serialized form follow the documents already read by
//! existing consumers (`lesson`, `short`, `timeTable`, `createdAt`, ...).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;

/// Names of the append-only snapshot logs.
pub mod logs {
    pub const TIMETABLE: &str = "TimeTableData";
    pub const SUBSTITUTIONS: &str = "substitutions";
    pub const TEACHERS: &str = "teachers";

    pub const ALL: [&str; 3] = [TIMETABLE, SUBSTITUTIONS, TEACHERS];
}

// ─── Timetable ──────────────────────────────────────────────

/// Teacher or room pointer taken from an anchor: `href` and visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "short")]
    pub short_label: String,
}

impl Reference {
    pub fn new(id: impl Into<String>, short_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            short_label: short_label.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.short_label.is_empty()
    }
}

/// One lesson of one (sub)group. All fields empty = no class scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonEntry {
    #[serde(rename = "lesson")]
    pub name: String,
    pub teacher: Reference,
    pub room: Reference,
}

impl LessonEntry {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.teacher.is_empty() && self.room.is_empty()
    }
}

/// Lessons sharing one grid position; more than one entry means parallel subgroups.
pub type Cell = Vec<LessonEntry>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlot {
    pub label: String,
}

impl TimeSlot {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub time: TimeSlot,
    pub lessons: Cell,
}

/// All time rows of one class-group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimetableColumn {
    pub entries: Vec<TimetableEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableSnapshot {
    pub times: Vec<TimeSlot>,
    pub columns: Vec<TimetableColumn>,
    pub captured_at: DateTime<Utc>,
}

impl TimetableSnapshot {
    /// `{ timeTable: "<json columns>", createdAt }`
    pub fn to_document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "timeTable": serde_json::to_string(&self.columns)?,
            "createdAt": format_created_at(self.captured_at),
        }))
    }
}

// ─── Substitutions ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRecord {
    pub nr: String,
    pub teacher: String,
    pub class: String,
    pub subject: String,
    pub room: String,
    pub substitute: String,
    pub reason: String,
    pub notes: String,
}

impl SubstitutionRecord {
    /// Number of table cells mapped onto a record.
    pub const FIELDS: usize = 8;

    /// Build a record from cell texts by position; missing trailing cells stay empty.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut record = Self::default();
        let slots = [
            &mut record.nr,
            &mut record.teacher,
            &mut record.class,
            &mut record.subject,
            &mut record.room,
            &mut record.substitute,
            &mut record.reason,
            &mut record.notes,
        ];
        for (slot, text) in slots.into_iter().zip(cells) {
            *slot = text;
        }
        record
    }
}

/// One day of a batch; `records: None` is the failure sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySubstitutions {
    pub url: String,
    pub records: Option<Vec<SubstitutionRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionBatch {
    pub days: Vec<DaySubstitutions>,
    pub captured_at: DateTime<Utc>,
}

impl SubstitutionBatch {
    pub fn failed_days(&self) -> usize {
        self.days.iter().filter(|d| d.records.is_none()).count()
    }

    /// `{ result: "<json url → records|null>", createdAt }`
    pub fn to_document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "result": serde_json::to_string(&OrderedDays(&self.days))?,
            "createdAt": format_created_at(self.captured_at),
        }))
    }
}

/// Serializes days as a JSON object keyed by URL, in request order.
struct OrderedDays<'a>(&'a [DaySubstitutions]);

impl Serialize for OrderedDays<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for day in self.0 {
            map.serialize_entry(&day.url, &day.records)?;
        }
        map.end()
    }
}

// ─── Teacher directory ──────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "short")]
    pub short_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherDirectorySnapshot {
    /// One slot per requested URL; `None` where the fetch failed.
    pub teachers: Vec<Option<TeacherRecord>>,
    pub captured_at: DateTime<Utc>,
}

impl TeacherDirectorySnapshot {
    pub fn found(&self) -> usize {
        self.teachers.iter().flatten().count()
    }

    /// `{ result: "<json [record|null]>", createdAt }`
    pub fn to_document_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "result": serde_json::to_string(&self.teachers)?,
            "createdAt": format_created_at(self.captured_at),
        }))
    }
}

// ─── Snapshot logs ──────────────────────────────────────────

/// A stored snapshot. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub id: String,
    pub log: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

/// RFC 3339 with millisecond precision, `Z` suffix.
pub fn format_created_at(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Truncate to the millisecond precision kept by stores.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

// ─── Jobs ───────────────────────────────────────────────────

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    Timetable,
    Substitutions,
    Teachers,
    /// Keep only the newest snapshot of `log`.
    Sweep { log: String },
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Timetable => write!(f, "timetable"),
            Job::Substitutions => write!(f, "substitutions"),
            Job::Teachers => write!(f, "teachers"),
            Job::Sweep { log } => write!(f, "sweep:{log}"),
        }
    }
}
