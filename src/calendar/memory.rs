//! In-memory host backend.
//!
//! Behaves like the host subsystem as far as the store can observe: handles
//! are detached copies until saved, saving assigns identifiers and replaces
//! the whole stored entity, and completion-based calls answer from a worker
//! thread. Used by the tests and by the binary where EventKit is unavailable.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::authorization::{AuthorizationStatus, EntityType};
use super::bridge::Completion;
use super::calendar::{CalendarType, SourceType};
use super::date::DateComponents;
use super::native::{ColorComponents, NativeCalendar, NativeReminder, NativeSource, NativeStore};

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySource {
    id: String,
    title: String,
    source_type: SourceType,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_type,
        }
    }
}

impl NativeSource for MemorySource {
    fn source_identifier(&self) -> String {
        self.id.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCalendar {
    identifier: String,
    calendar_type: CalendarType,
    title: String,
    color: Option<ColorComponents>,
    subscribed: bool,
    source: Option<MemorySource>,
}

impl MemoryCalendar {
    pub fn new(calendar_type: CalendarType) -> Self {
        Self {
            identifier: String::new(),
            calendar_type,
            title: String::new(),
            color: None,
            subscribed: false,
            source: None,
        }
    }

    /// A calendar that already exists on the host.
    pub fn existing(id: impl Into<String>, title: impl Into<String>, source: &MemorySource) -> Self {
        Self {
            identifier: id.into(),
            title: title.into(),
            source: Some(source.clone()),
            ..Self::new(CalendarType::Local)
        }
    }

    pub fn subscribed(mut self) -> Self {
        self.subscribed = true;
        self.calendar_type = CalendarType::Subscription;
        self
    }
}

impl NativeCalendar for MemoryCalendar {
    type Source = MemorySource;

    fn calendar_identifier(&self) -> String {
        self.identifier.clone()
    }

    fn calendar_type(&self) -> CalendarType {
        self.calendar_type
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn color(&self) -> Option<ColorComponents> {
        self.color
    }

    fn set_color(&mut self, color: ColorComponents) {
        self.color = Some(color);
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn source(&self) -> Option<MemorySource> {
        self.source.clone()
    }

    fn set_source(&mut self, source: &MemorySource) {
        self.source = Some(source.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryReminder {
    identifier: String,
    calendar_identifier: Option<String>,
    title: Option<String>,
    start: Option<DateComponents>,
    due: Option<DateComponents>,
    completed: bool,
    completion_date: Option<DateTime<Utc>>,
    priority: i64,
    location: Option<String>,
    url: Option<String>,
    notes: Option<String>,
}

impl MemoryReminder {
    pub fn calendar_identifier(&self) -> Option<&str> {
        self.calendar_identifier.as_deref()
    }
}

impl NativeReminder for MemoryReminder {
    type Calendar = MemoryCalendar;

    fn calendar_item_identifier(&self) -> String {
        self.identifier.clone()
    }

    fn set_calendar(&mut self, calendar: &MemoryCalendar) {
        self.calendar_identifier = Some(calendar.identifier.clone());
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn start_date_components(&self) -> Option<DateComponents> {
        self.start.clone()
    }

    fn set_start_date_components(&mut self, components: Option<DateComponents>) {
        self.start = components;
    }

    fn due_date_components(&self) -> Option<DateComponents> {
        self.due.clone()
    }

    fn set_due_date_components(&mut self, components: Option<DateComponents>) {
        self.due = components;
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn set_completed(&mut self, completed: bool) {
        if completed && !self.completed {
            self.completion_date = Some(Utc::now());
        } else if !completed {
            self.completion_date = None;
        }
        self.completed = completed;
    }

    fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.completion_date
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn set_priority(&mut self, priority: i64) {
        self.priority = priority;
    }

    fn location(&self) -> Option<String> {
        self.location.clone()
    }

    fn set_location(&mut self, location: Option<&str>) {
        self.location = location.map(str::to_string);
    }

    fn url(&self) -> Option<String> {
        self.url.clone()
    }

    fn set_url(&mut self, url: Option<&str>) {
        self.url = url.map(str::to_string);
    }

    fn has_notes(&self) -> bool {
        self.notes.is_some()
    }

    fn notes(&self) -> Option<String> {
        self.notes.clone()
    }

    fn set_notes(&mut self, notes: Option<&str>) {
        self.notes = notes.map(str::to_string);
    }
}

/// Calendars a reminder fetch is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPredicate {
    calendar_ids: Vec<String>,
}

#[derive(Debug)]
struct State {
    authorization: AuthorizationStatus,
    grant: AuthorizationStatus,
    sources: Vec<MemorySource>,
    calendars: Vec<MemoryCalendar>,
    reminders: Vec<MemoryReminder>,
    fail_saves: bool,
    null_entries: usize,
    access_requests: usize,
    commits: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    time_zone: String,
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// A host with one local source and one empty "Reminders" list, waiting
    /// for its first access request.
    pub fn with_local_source(time_zone: impl Into<String>) -> Self {
        let source = MemorySource::new("local", "On My Mac", SourceType::Local);
        Self::builder()
            .authorization(AuthorizationStatus::NotDetermined)
            .calendar(MemoryCalendar::existing("reminders", "Reminders", &source))
            .source(source)
            .time_zone(time_zone)
            .build()
    }

    /// Number of access prompts the host has shown.
    pub fn access_requests(&self) -> usize {
        self.state.lock().access_requests
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }
}

impl NativeStore for MemoryStore {
    type Source = MemorySource;
    type Calendar = MemoryCalendar;
    type Reminder = MemoryReminder;
    type Predicate = MemoryPredicate;

    fn local_time_zone(&self) -> Option<String> {
        Some(self.time_zone.clone())
    }

    fn authorization_status(&self, entity: EntityType) -> AuthorizationStatus {
        match entity {
            EntityType::Reminder => self.state.lock().authorization,
            EntityType::Event => AuthorizationStatus::NotDetermined,
        }
    }

    fn request_full_access_to_reminders(&self, completion: Completion<bool>) {
        let state = Arc::clone(&self.state);
        thread::spawn(move || {
            let granted = {
                let mut state = state.lock();
                state.access_requests += 1;
                if state.authorization == AuthorizationStatus::NotDetermined {
                    state.authorization = state.grant;
                }
                state.authorization == AuthorizationStatus::FullAccess
            };
            completion.succeed(granted);
        });
    }

    fn calendars(&self, entity: EntityType) -> Vec<MemoryCalendar> {
        match entity {
            EntityType::Reminder => self.state.lock().calendars.clone(),
            EntityType::Event => Vec::new(),
        }
    }

    fn calendar_with_identifier(&self, id: &str) -> Option<MemoryCalendar> {
        self.state
            .lock()
            .calendars
            .iter()
            .find(|c| c.identifier == id)
            .cloned()
    }

    fn source_with_identifier(&self, id: &str) -> Option<MemorySource> {
        self.state.lock().sources.iter().find(|s| s.id == id).cloned()
    }

    fn new_calendar(&self, _entity: EntityType) -> MemoryCalendar {
        MemoryCalendar::new(CalendarType::Local)
    }

    fn save_calendar(&self, calendar: &mut MemoryCalendar) -> Result<(), String> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err("the calendar store rejected the change".to_string());
        }
        if calendar.source.is_none() {
            return Err("calendar has no source".to_string());
        }
        if calendar.identifier.is_empty() {
            calendar.identifier = uuid::Uuid::new_v4().to_string().to_uppercase();
        }

        match state
            .calendars
            .iter_mut()
            .find(|c| c.identifier == calendar.identifier)
        {
            Some(stored) => *stored = calendar.clone(),
            None => state.calendars.push(calendar.clone()),
        }
        state.commits += 1;
        Ok(())
    }

    fn predicate_for_reminders_in_calendars(&self, calendars: &[MemoryCalendar]) -> MemoryPredicate {
        MemoryPredicate {
            calendar_ids: calendars.iter().map(|c| c.identifier.clone()).collect(),
        }
    }

    fn fetch_reminders(
        &self,
        predicate: MemoryPredicate,
        completion: Completion<Vec<Option<MemoryReminder>>>,
    ) {
        let state = Arc::clone(&self.state);
        thread::spawn(move || {
            let state = state.lock();
            let mut found: Vec<Option<MemoryReminder>> = vec![None; state.null_entries];
            found.extend(
                state
                    .reminders
                    .iter()
                    .filter(|r| {
                        r.calendar_identifier
                            .as_ref()
                            .is_some_and(|id| predicate.calendar_ids.contains(id))
                    })
                    .cloned()
                    .map(Some),
            );
            drop(state);
            completion.succeed(found);
        });
    }

    fn reminder_with_identifier(&self, id: &str) -> Option<MemoryReminder> {
        self.state
            .lock()
            .reminders
            .iter()
            .find(|r| r.identifier == id)
            .cloned()
    }

    fn new_reminder(&self) -> MemoryReminder {
        MemoryReminder::default()
    }

    fn save_reminder(&self, reminder: &mut MemoryReminder) -> Result<(), String> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err("the calendar store rejected the change".to_string());
        }
        let Some(calendar_id) = reminder.calendar_identifier.as_deref() else {
            return Err("reminder has no calendar".to_string());
        };
        if !state.calendars.iter().any(|c| c.identifier == calendar_id) {
            return Err(format!("calendar {calendar_id} no longer exists"));
        }
        if reminder.identifier.is_empty() {
            reminder.identifier = uuid::Uuid::new_v4().to_string().to_uppercase();
        }

        match state
            .reminders
            .iter_mut()
            .find(|r| r.identifier == reminder.identifier)
        {
            Some(stored) => *stored = reminder.clone(),
            None => state.reminders.push(reminder.clone()),
        }
        state.commits += 1;
        Ok(())
    }
}

pub struct MemoryStoreBuilder {
    authorization: AuthorizationStatus,
    grant: AuthorizationStatus,
    sources: Vec<MemorySource>,
    calendars: Vec<MemoryCalendar>,
    time_zone: String,
    fail_saves: bool,
    null_entries: usize,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            authorization: AuthorizationStatus::FullAccess,
            grant: AuthorizationStatus::FullAccess,
            sources: Vec::new(),
            calendars: Vec::new(),
            time_zone: "UTC".to_string(),
            fail_saves: false,
            null_entries: 0,
        }
    }
}

impl MemoryStoreBuilder {
    pub fn authorization(mut self, status: AuthorizationStatus) -> Self {
        self.authorization = status;
        self
    }

    /// Status the host settles on when the user answers the access prompt.
    pub fn grant_on_request(mut self, status: AuthorizationStatus) -> Self {
        self.grant = status;
        self
    }

    pub fn source(mut self, source: MemorySource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn calendar(mut self, calendar: MemoryCalendar) -> Self {
        self.calendars.push(calendar);
        self
    }

    pub fn time_zone(mut self, name: impl Into<String>) -> Self {
        self.time_zone = name.into();
        self
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    /// Prefix every fetch result with `count` null entries.
    pub fn null_entries(mut self, count: usize) -> Self {
        self.null_entries = count;
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            state: Arc::new(Mutex::new(State {
                authorization: self.authorization,
                grant: self.grant,
                sources: self.sources,
                calendars: self.calendars,
                reminders: Vec::new(),
                fail_saves: self.fail_saves,
                null_entries: self.null_entries,
                access_requests: 0,
                commits: 0,
            })),
            time_zone: self.time_zone,
        }
    }
}
