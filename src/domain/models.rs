use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The backend hands out integers today; the wire form is kept as received so
/// a numeric id goes back out as a number. Equality is exact: `1` and `"1"`
/// are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(RawId);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(RawId::Text(value.into()))
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(match value.parse::<i64>() {
            Ok(number) => Self(RawId::Number(number)),
            Err(_) => Self::new(value),
        })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            RawId::Number(value) => write!(f, "{value}"),
            RawId::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(RawId::Number(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id.to_string(), "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if self.updated_at < self.created_at {
            return Err("task.updated_at must be >= task.created_at".to_string());
        }
        Ok(())
    }

    pub fn with_completed(&self, completed: bool) -> Task {
        Task {
            completed,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl NewTask {
    pub fn from_input(title: &str, description: Option<&str>) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            description: description.map(str::trim).unwrap_or_default().to_string(),
            completed: false,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateGroup {
    pub date: NaiveDate,
    #[serde(default, rename = "todos", deserialize_with = "null_as_empty")]
    pub tasks: Vec<Task>,
}

impl DateGroup {
    pub fn new(date: NaiveDate, tasks: Vec<Task>) -> Self {
        Self { date, tasks }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RangeUnit {
    Day,
    Week,
    Month,
}

impl RangeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn is_grouped(self) -> bool {
        !matches!(self, Self::Day)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

impl fmt::Display for RangeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Prev,
    Next,
}

pub fn format_timestamp<Tz>(value: DateTime<Utc>, zone: &Tz) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: fmt::Display,
{
    value.with_timezone(zone).format("%Y-%m-%d %H:%M").to_string()
}

/// Go encodes empty slices as `null`.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
