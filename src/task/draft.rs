//! Validated task input: creation drafts, form submissions and patches.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::{NewTaskRecord, Quadrant, Task};
use crate::error::ValidationError;

/// Fields a user supplies when creating a task. The title is never blank.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    title: String,
    description: String,
    due_date: Option<DateTime<Utc>>,
    quadrant: Quadrant,
}

impl TaskDraft {
    /// Builds a draft with no description and no deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] if the title is blank.
    pub fn new(title: impl Into<String>, quadrant: Quadrant) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self { title, description: String::new(), due_date: None, quadrant })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    /// The validated title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The target quadrant.
    #[must_use]
    pub fn quadrant(&self) -> Quadrant {
        self.quadrant
    }

    /// Stamps ownership and creation metadata for submission.
    #[must_use]
    pub fn into_record(self, owner_id: &str, now: DateTime<Utc>) -> NewTaskRecord {
        NewTaskRecord {
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            quadrant: self.quadrant,
            completed: false,
            created_at: now,
            completed_at: None,
            owner_id: owner_id.to_string(),
        }
    }
}

/// Raw strings from the add/edit task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    /// Title input.
    pub title: String,
    /// Description input.
    pub description: String,
    /// `YYYY-MM-DD` or empty.
    pub due_date: String,
    /// `HH:MM` or empty.
    pub due_time: String,
    /// Selected quadrant.
    pub quadrant: Quadrant,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            due_time: String::new(),
            quadrant: Quadrant::UrgentImportant,
        }
    }
}

impl TaskForm {
    /// Pre-fills the form from an existing task, in the given time zone.
    #[must_use]
    pub fn from_task_in<Tz: TimeZone>(task: &Task, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let (due_date, due_time) = task.due_date.map_or_else(
            || (String::new(), String::new()),
            |due| {
                let local = due.with_timezone(tz);
                (local.format("%Y-%m-%d").to_string(), local.format("%H:%M").to_string())
            },
        );
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date,
            due_time,
            quadrant: task.quadrant,
        }
    }

    /// Resolves the due date and time fields to an instant in `tz`.
    ///
    /// A date without a time means local midnight. A time without a date is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if either field is malformed or the wall-clock time
    /// does not exist in `tz`.
    pub fn due_instant_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
    ) -> Result<Option<DateTime<Utc>>, ValidationError> {
        let date_raw = self.due_date.trim();
        if date_raw.is_empty() {
            return Ok(None);
        }
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date_raw.to_string()))?;
        let time_raw = self.due_time.trim();
        let time = if time_raw.is_empty() {
            NaiveTime::MIN
        } else {
            NaiveTime::parse_from_str(time_raw, "%H:%M")
                .map_err(|_| ValidationError::InvalidTime(time_raw.to_string()))?
        };
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|local| Some(local.with_timezone(&Utc)))
            .ok_or_else(|| ValidationError::InvalidTime(time_raw.to_string()))
    }

    /// Validates the form as a new task in `tz`.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn into_draft_in<Tz: TimeZone>(self, tz: &Tz) -> Result<TaskDraft, ValidationError> {
        let due_date = self.due_instant_in(tz)?;
        Ok(TaskDraft::new(self.title, self.quadrant)?
            .with_description(self.description)
            .with_due_date(due_date))
    }

    /// Validates the form as a full replacement of an existing task's
    /// editable fields.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn into_patch_in<Tz: TimeZone>(self, tz: &Tz) -> Result<TaskPatch, ValidationError> {
        let due = match self.due_instant_in(tz)? {
            Some(instant) => DueChange::Set(instant),
            None => DueChange::Clear,
        };
        Ok(TaskPatch::new()
            .with_title(self.title)?
            .with_description(self.description)
            .with_due(due)
            .with_quadrant(self.quadrant))
    }
}

/// Tri-state deadline edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueChange {
    /// Remove the deadline.
    Clear,
    /// Set a new deadline.
    Set(DateTime<Utc>),
}

/// Partial edit of a task's user-editable fields.
///
/// There is no way to express `id`, `ownerId` or `createdAt` here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    title: Option<String>,
    description: Option<String>,
    due: Option<DueChange>,
    quadrant: Option<Quadrant>,
}

impl TaskPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] if the title is blank.
    pub fn with_title(mut self, title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        self.title = Some(title);
        Ok(self)
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets or clears the deadline.
    #[must_use]
    pub fn with_due(mut self, due: DueChange) -> Self {
        self.due = Some(due);
        self
    }

    /// Moves the task to another quadrant.
    #[must_use]
    pub fn with_quadrant(mut self, quadrant: Quadrant) -> Self {
        self.quadrant = Some(quadrant);
        self
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.quadrant.is_none()
    }

    /// Wire form of the patch.
    #[must_use]
    pub fn to_record_patch(&self) -> RecordPatch {
        let mut patch = RecordPatch::default();
        if let Some(title) = &self.title {
            patch.set("title", Value::String(title.clone()));
        }
        if let Some(description) = &self.description {
            patch.set("description", Value::String(description.clone()));
        }
        match self.due {
            Some(DueChange::Set(instant)) => patch.set("dueDate", timestamp(instant)),
            Some(DueChange::Clear) => patch.set("dueDate", Value::Null),
            None => {}
        }
        if let Some(quadrant) = self.quadrant {
            patch.set("quadrant", Value::String(quadrant.as_str().to_string()));
        }
        patch
    }
}

/// Flat field map sent to the feed's update operation.
///
/// Only this crate can build one, so protected fields never appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch(Map<String, Value>);

impl RecordPatch {
    /// Patch for a completion toggle: the flag and its paired timestamp.
    #[must_use]
    pub fn completion(completed: bool, at: Option<DateTime<Utc>>) -> Self {
        let mut patch = Self::default();
        patch.set("completed", Value::Bool(completed));
        patch.set("completedAt", at.map_or(Value::Null, timestamp));
        patch
    }

    /// Patch that reassigns the quadrant.
    #[must_use]
    pub fn quadrant(quadrant: Quadrant) -> Self {
        TaskPatch::new().with_quadrant(quadrant).to_record_patch()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Looks up one field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrows the field map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies the patch onto a full record map.
    pub fn apply_to(&self, record: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            record.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for RecordPatch {
    fn from(fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        for protected in ["id", "ownerId", "createdAt"] {
            fields.remove(protected);
        }
        Self(fields)
    }
}

fn timestamp(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}
