use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

use crate::error::SessionError;

/// Sunday-first, matching `day_of_week` numbering.
pub const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Order days are shown in tabs and weekly tables.
pub const DISPLAY_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const HOURS_PER_DAY: usize = 24;

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// One raw upload: a file name and its full text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub raw_text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A normalized support response. The calendar fields are derived from
/// `timestamp` at construction and cannot drift from it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEvent {
    agent_id: String,
    timestamp: NaiveDateTime,
    calendar_date: NaiveDate,
    day_of_week: u8,
    hour_of_day: u8,
    source_file: String,
}

impl ResponseEvent {
    pub fn new(
        agent_id: impl Into<String>,
        timestamp: NaiveDateTime,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            timestamp,
            calendar_date: timestamp.date(),
            day_of_week: timestamp.weekday().num_days_from_sunday() as u8,
            hour_of_day: timestamp.hour() as u8,
            source_file: source_file.into(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn calendar_date(&self) -> NaiveDate {
        self.calendar_date
    }

    /// 0 = Sunday
    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    pub fn weekday(&self) -> Weekday {
        WEEK_DAYS[self.day_of_week as usize]
    }

    pub fn hour_of_day(&self) -> u8 {
        self.hour_of_day
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub event_count: usize,
}

/// Inclusive calendar range. Partitioned weeks start on a Sunday and end
/// on the last date that has data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SessionError> {
        if start > end {
            return Err(SessionError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum AgentFilter {
    #[default]
    All,
    Agent(String),
}

impl AgentFilter {
    pub fn matches(&self, agent_id: &str) -> bool {
        match self {
            AgentFilter::All => true,
            AgentFilter::Agent(wanted) => wanted == agent_id,
        }
    }

    pub fn agent(&self) -> Option<&str> {
        match self {
            AgentFilter::All => None,
            AgentFilter::Agent(agent) => Some(agent),
        }
    }
}

impl FromStr for AgentFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed.is_empty() {
            Ok(AgentFilter::All)
        } else {
            Ok(AgentFilter::Agent(trimmed.to_string()))
        }
    }
}

impl fmt::Display for AgentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentFilter::All => f.write_str("all"),
            AgentFilter::Agent(agent) => f.write_str(agent),
        }
    }
}

impl From<AgentFilter> for String {
    fn from(filter: AgentFilter) -> Self {
        filter.to_string()
    }
}

/// Which presentation the host is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Hour-by-hour counts for one day
    #[default]
    Hourly,
    /// Every agent's hours for one day
    Team,
    /// One agent's hours across the whole week
    User,
}
