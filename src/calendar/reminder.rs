use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::date::{DateInput, PartialDate};

/// Marker for a reminder field this crate does not read or write yet.
/// Serializes as the string `"unsupported"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unsupported;

impl Serialize for Unsupported {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("unsupported")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub start_date: Option<PartialDate>,
    pub due_date: Option<PartialDate>,
    pub is_completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub priority: i64,
    pub location: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub alarms: Unsupported,
    pub recurrence_rules: Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderCreate {
    pub title: String,
    #[serde(default)]
    pub start_date: Option<DateInput>,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReminderCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_date: None,
            due_date: None,
            priority: 0,
            location: None,
            url: None,
            notes: None,
        }
    }
}

/// Fields to change on a reminder. `None` leaves a field as it is; there is
/// no way to reset a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateInput>,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
