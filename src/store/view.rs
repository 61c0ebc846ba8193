//! Ephemeral view configuration.

use std::fmt;
use std::str::FromStr;

/// Due-date window applied by the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    /// No date restriction.
    #[default]
    All,
    /// Due within the current calendar day.
    Today,
    /// Due within the current calendar week.
    ThisWeek,
}

impl DateFilter {
    /// Command-line spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::ThisWeek => "this-week",
        }
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "this-week" | "this_week" | "week" => Ok(Self::ThisWeek),
            other => Err(format!("unknown date filter {other:?}, expected all, today or this-week")),
        }
    }
}

/// Presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Four-quadrant grid.
    #[default]
    Grid,
    /// One list per quadrant with active and completed sections.
    List,
    /// A single list in all-tasks order.
    All,
    /// Day and month calendar.
    Calendar,
}

impl ViewMode {
    /// Command-line spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
            Self::All => "all",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "list" => Ok(Self::List),
            "all" => Ok(Self::All),
            "calendar" => Ok(Self::Calendar),
            other => Err(format!("unknown view {other:?}, expected grid, list, all or calendar")),
        }
    }
}

/// Search, visibility and presentation settings. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Case-insensitive substring matched against title and description.
    pub search: String,
    /// Whether completed tasks are shown.
    pub show_completed: bool,
    /// Due-date window.
    pub date_filter: DateFilter,
    /// Presentation mode.
    pub mode: ViewMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            search: String::new(),
            show_completed: true,
            date_filter: DateFilter::All,
            mode: ViewMode::Grid,
        }
    }
}
