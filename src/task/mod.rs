//! Task domain model.
//!
//! A [`Task`] is the decoded form of one feed record. Records are flat
//! camelCase maps with RFC 3339 timestamps; see [`NewTaskRecord`] for the
//! shape submitted on creation.

pub mod dates;
pub mod draft;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

pub use draft::{DueChange, RecordPatch, TaskDraft, TaskForm, TaskPatch};

/// Identifier assigned by the feed when a task is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The four urgent/important priority classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quadrant {
    /// Do now.
    #[serde(rename = "1")]
    UrgentImportant,
    /// Plan.
    #[serde(rename = "2")]
    NotUrgentImportant,
    /// Delegate.
    #[serde(rename = "3")]
    UrgentNotImportant,
    /// Eliminate.
    #[serde(rename = "4")]
    NotUrgentNotImportant,
}

impl Quadrant {
    /// All quadrants in priority order.
    pub const ALL: [Self; 4] = [
        Self::UrgentImportant,
        Self::NotUrgentImportant,
        Self::UrgentNotImportant,
        Self::NotUrgentNotImportant,
    ];

    /// Priority rank, 1 (highest) to 4.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::UrgentImportant => 1,
            Self::NotUrgentImportant => 2,
            Self::UrgentNotImportant => 3,
            Self::NotUrgentNotImportant => 4,
        }
    }

    /// Zero-based bucket index.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.rank() - 1)
    }

    /// Wire value (`"1"`..`"4"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UrgentImportant => "1",
            Self::NotUrgentImportant => "2",
            Self::UrgentNotImportant => "3",
            Self::NotUrgentNotImportant => "4",
        }
    }

    /// Heading shown above the quadrant.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::UrgentImportant => "Do Now (Urgent & Important)",
            Self::NotUrgentImportant => "Plan (Not Urgent but Important)",
            Self::UrgentNotImportant => "Delegate (Urgent but Not Important)",
            Self::NotUrgentNotImportant => "Eliminate (Not Urgent & Not Important)",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::UrgentImportant),
            "2" => Ok(Self::NotUrgentImportant),
            "3" => Ok(Self::UrgentNotImportant),
            "4" => Ok(Self::NotUrgentNotImportant),
            other => Err(ValidationError::UnknownQuadrant(other.to_string())),
        }
    }
}

/// One task as held by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Feed-assigned identifier.
    pub id: TaskId,
    /// Display title, never blank.
    pub title: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Deadline, if any.
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    /// Priority class.
    pub quadrant: Quadrant,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation instant, immutable.
    pub created_at: DateTime<Utc>,
    /// Set exactly while `completed` is true.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Uid of the creating user.
    pub owner_id: String,
}

impl Task {
    /// Decodes a feed record.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first field that failed to decode.
    pub fn from_record(record: serde_json::Value) -> Result<Self, String> {
        let task: Self = serde_json::from_value(record).map_err(|e| e.to_string())?;
        if task.title.trim().is_empty() {
            return Err(format!("task {} has a blank title", task.id));
        }
        if !task.completion_is_consistent() {
            return Err(format!("task {} has completed and completedAt out of step", task.id));
        }
        Ok(task)
    }

    /// Returns `true` when `completed` and `completed_at` agree.
    #[must_use]
    pub fn completion_is_consistent(&self) -> bool {
        self.completed == self.completed_at.is_some()
    }
}

/// Record submitted to the feed on creation; the feed assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRecord {
    /// Display title.
    pub title: String,
    /// Free text.
    pub description: String,
    /// Deadline, if any.
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    /// Priority class.
    pub quadrant: Quadrant,
    /// Always `false` at creation.
    pub completed: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Always `None` at creation.
    pub completed_at: Option<DateTime<Utc>>,
    /// Uid of the creating user.
    pub owner_id: String,
}

impl NewTaskRecord {
    /// Attaches the feed-assigned id.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            quadrant: self.quadrant,
            completed: self.completed,
            created_at: self.created_at,
            completed_at: self.completed_at,
            owner_id: self.owner_id,
        }
    }
}

/// Accepts RFC 3339, date-only `YYYY-MM-DD` (midnight UTC), `""` or null.
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_instant(value).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parses an absolute instant from RFC 3339 or a bare date.
///
/// # Errors
///
/// Returns a message when the value is neither form.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| format!("invalid timestamp {value:?}"))
}
