use serde::{Deserialize, Serialize};

use super::color::Rgba;

/// Account a reminder list lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Local,
    Exchange,
    Caldav,
    MobileMe,
    Subscribed,
    Birthdays,
}

impl SourceType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SourceType::Local),
            1 => Some(SourceType::Exchange),
            2 => Some(SourceType::Caldav),
            3 => Some(SourceType::MobileMe),
            4 => Some(SourceType::Subscribed),
            5 => Some(SourceType::Birthdays),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarType {
    Local,
    Caldav,
    Exchange,
    Subscription,
    Birthday,
}

impl CalendarType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CalendarType::Local),
            1 => Some(CalendarType::Caldav),
            2 => Some(CalendarType::Exchange),
            3 => Some(CalendarType::Subscription),
            4 => Some(CalendarType::Birthday),
            _ => None,
        }
    }
}

/// A source of reminder lists, such as the local store or a CalDAV account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

/// A reminder list. `id` and `list_type` are assigned by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderList {
    pub id: String,
    #[serde(rename = "type")]
    pub list_type: CalendarType,
    pub title: String,
    pub color: Rgba,
    pub is_subscribed: bool,
    pub source: Source,
}

/// Reference to an existing entity by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identified {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderListCreate {
    pub title: String,
    #[serde(default)]
    pub color: Option<Rgba>,
    pub source: Identified,
}

impl ReminderListCreate {
    pub fn new(title: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: None,
            source: Identified {
                id: source_id.into(),
            },
        }
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }
}

/// Fields to change on a list. `None` leaves a field as it is; there is no
/// way to reset a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderListUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<Rgba>,
}

impl ReminderListUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.color.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_codes_follow_host_numbering() {
        assert_eq!(SourceType::from_code(2), Some(SourceType::Caldav));
        assert_eq!(SourceType::from_code(5), Some(SourceType::Birthdays));
        assert_eq!(CalendarType::from_code(2), Some(CalendarType::Exchange));
        assert_eq!(CalendarType::from_code(9), None);
    }

    #[test]
    fn list_create_reads_nested_source() {
        let create: ReminderListCreate =
            serde_json::from_str(r#"{"title":"Groceries","source":{"id":"src-1"}}"#).unwrap();
        assert_eq!(create, ReminderListCreate::new("Groceries", "src-1"));
    }

    #[test]
    fn list_serializes_type_field() {
        let list = ReminderList {
            id: "cal-1".into(),
            list_type: CalendarType::Caldav,
            title: "Work".into(),
            color: Rgba::WHITE,
            is_subscribed: false,
            source: Source {
                id: "src-1".into(),
                title: "iCloud".into(),
                source_type: SourceType::Caldav,
            },
        };
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["type"], "caldav");
        assert_eq!(json["source"]["type"], "caldav");
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(ReminderListUpdate::default().is_empty());
        let update = ReminderListUpdate {
            title: Some("Home".into()),
            color: None,
        };
        assert!(!update.is_empty());
    }
}
