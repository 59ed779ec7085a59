//! The host reminders subsystem as seen by the store.
//!
//! Handles expose field accessors and mutators only; persistence goes through
//! [`NativeStore`]. Mutating a handle changes nothing on the host until it is
//! saved.

use chrono::{DateTime, Utc};

use super::authorization::{AuthorizationStatus, EntityType};
use super::bridge::Completion;
use super::calendar::{CalendarType, SourceType};
use super::date::DateComponents;

/// Raw color channels as the host reports them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorComponents {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

pub trait NativeSource {
    fn source_identifier(&self) -> String;
    fn title(&self) -> String;
    fn source_type(&self) -> SourceType;
}

pub trait NativeCalendar {
    type Source: NativeSource;

    /// Empty until the calendar has been saved.
    fn calendar_identifier(&self) -> String;
    fn calendar_type(&self) -> CalendarType;
    fn title(&self) -> String;
    fn set_title(&mut self, title: &str);
    fn color(&self) -> Option<ColorComponents>;
    fn set_color(&mut self, color: ColorComponents);
    fn is_subscribed(&self) -> bool;
    fn source(&self) -> Option<Self::Source>;
    fn set_source(&mut self, source: &Self::Source);
}

pub trait NativeReminder {
    type Calendar: NativeCalendar;

    /// Empty until the reminder has been saved.
    fn calendar_item_identifier(&self) -> String;
    fn set_calendar(&mut self, calendar: &Self::Calendar);
    fn title(&self) -> Option<String>;
    fn set_title(&mut self, title: &str);
    fn start_date_components(&self) -> Option<DateComponents>;
    fn set_start_date_components(&mut self, components: Option<DateComponents>);
    fn due_date_components(&self) -> Option<DateComponents>;
    fn set_due_date_components(&mut self, components: Option<DateComponents>);
    fn is_completed(&self) -> bool;
    /// The host stamps or clears the completion date itself.
    fn set_completed(&mut self, completed: bool);
    fn completion_date(&self) -> Option<DateTime<Utc>>;
    fn priority(&self) -> i64;
    fn set_priority(&mut self, priority: i64);
    fn location(&self) -> Option<String>;
    fn set_location(&mut self, location: Option<&str>);
    /// Absolute string of the attached URL, if the host returns one.
    fn url(&self) -> Option<String>;
    fn set_url(&mut self, url: Option<&str>);
    fn has_notes(&self) -> bool;
    fn notes(&self) -> Option<String>;
    fn set_notes(&mut self, notes: Option<&str>);
}

/// A long-lived handle on the host reminders subsystem.
///
/// Opened once per process and shared by every request. Implementations must
/// tolerate calls from several threads; no extra serialization is added on
/// top, so concurrent saves of one entity race and the last commit wins.
pub trait NativeStore: Send + Sync {
    type Source: NativeSource;
    type Calendar: NativeCalendar<Source = Self::Source>;
    type Reminder: NativeReminder<Calendar = Self::Calendar>;
    type Predicate;

    /// Local zone of the host, as an IANA name.
    fn local_time_zone(&self) -> Option<String>;

    fn authorization_status(&self, entity: EntityType) -> AuthorizationStatus;
    fn request_full_access_to_reminders(&self, completion: Completion<bool>);

    fn calendars(&self, entity: EntityType) -> Vec<Self::Calendar>;
    fn calendar_with_identifier(&self, id: &str) -> Option<Self::Calendar>;
    fn source_with_identifier(&self, id: &str) -> Option<Self::Source>;
    fn new_calendar(&self, entity: EntityType) -> Self::Calendar;
    /// Commit a calendar. The error text is informational only.
    fn save_calendar(&self, calendar: &mut Self::Calendar) -> Result<(), String>;

    fn predicate_for_reminders_in_calendars(&self, calendars: &[Self::Calendar]) -> Self::Predicate;
    /// The host may include null entries in the delivered list.
    fn fetch_reminders(
        &self,
        predicate: Self::Predicate,
        completion: Completion<Vec<Option<Self::Reminder>>>,
    );
    fn reminder_with_identifier(&self, id: &str) -> Option<Self::Reminder>;
    fn new_reminder(&self) -> Self::Reminder;
    fn save_reminder(&self, reminder: &mut Self::Reminder) -> Result<(), String>;
}
