use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use super::authorization::{Access, AuthorizationGate, AuthorizationStatus, EntityType};
use super::bridge;
use super::calendar::{ReminderList, ReminderListCreate, ReminderListUpdate};
use super::date::DateComponentCodec;
use super::mapper;
use super::native::{NativeCalendar, NativeReminder, NativeStore};
use super::reminder::{Reminder, ReminderCreate, ReminderUpdate};
use crate::error::{Error, Result};

/// Reminder lists and reminders of the host, behind the reminders permission.
///
/// Every operation checks the permission first and fails with
/// [`Error::Unauthorized`] instead of prompting. Nothing here serializes
/// writes: two concurrent updates of the same entity race and the last commit
/// wins.
pub struct ReminderStore<N> {
    native: N,
    gate: AuthorizationGate,
    codec: DateComponentCodec,
    timeout: Option<Duration>,
}

impl<N: NativeStore> ReminderStore<N> {
    /// Dates are encoded in the host's local zone. A host that cannot name its
    /// zone gets UTC.
    pub fn new(native: N) -> Self {
        let zone = native
            .local_time_zone()
            .and_then(|name| match name.parse::<Tz>() {
                Ok(zone) => Some(zone),
                Err(_) => {
                    tracing::warn!(zone = %name, "unknown host time zone");
                    None
                }
            })
            .unwrap_or_else(|| {
                tracing::warn!("host time zone unavailable, evaluating dates in UTC");
                Tz::UTC
            });
        Self::with_codec(native, DateComponentCodec::new(zone))
    }

    pub fn with_codec(native: N, codec: DateComponentCodec) -> Self {
        Self {
            native,
            gate: AuthorizationGate::new(),
            codec,
            timeout: None,
        }
    }

    /// Bound every completion-based host call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.gate = AuthorizationGate::with_timeout(timeout);
        self.timeout = Some(timeout);
        self
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn codec(&self) -> &DateComponentCodec {
        &self.codec
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.gate.status(&self.native)
    }

    /// Blocks until the host answers, possibly after a user prompt. Run it at
    /// startup, not while serving requests.
    pub fn request_access(&self) -> Result<bool> {
        self.gate.request(&self.native)
    }

    pub fn list_reminder_lists(&self) -> Result<Vec<ReminderList>> {
        self.gate.check(&self.native, Access::Read)?;
        Ok(self
            .native
            .calendars(EntityType::Reminder)
            .iter()
            .map(mapper::reminder_list_to_domain)
            .collect())
    }

    pub fn get_reminder_list(&self, id: &str) -> Result<Option<ReminderList>> {
        self.gate.check(&self.native, Access::Read)?;
        Ok(self
            .native
            .calendar_with_identifier(id)
            .map(|calendar| mapper::reminder_list_to_domain(&calendar)))
    }

    pub fn create_reminder_list(&self, create: &ReminderListCreate) -> Result<ReminderList> {
        self.gate.check(&self.native, Access::Write)?;
        let source = self
            .native
            .source_with_identifier(&create.source.id)
            .ok_or_else(|| Error::NotFound(format!("source {}", create.source.id)))?;

        let mut calendar = self.native.new_calendar(EntityType::Reminder);
        mapper::apply_list_create(&mut calendar, create);
        calendar.set_source(&source);
        self.commit_calendar(&mut calendar)?;

        tracing::info!(id = %calendar.calendar_identifier(), "created reminder list");
        Ok(mapper::reminder_list_to_domain(&calendar))
    }

    pub fn update_reminder_list(&self, id: &str, update: &ReminderListUpdate) -> Result<ReminderList> {
        self.gate.check(&self.native, Access::Read)?;
        let mut calendar = self
            .native
            .calendar_with_identifier(id)
            .ok_or_else(|| Error::NotFound(format!("reminder list {id}")))?;

        mapper::apply_list_update(&mut calendar, update);
        self.commit_calendar(&mut calendar)?;
        Ok(mapper::reminder_list_to_domain(&calendar))
    }

    /// Deleting reminder lists is not offered.
    pub fn delete_reminder_list(&self, _id: &str) -> Result<()> {
        Err(Error::Unsupported("deleting reminder lists"))
    }

    /// Reminders in the given lists. Ids that match no list are ignored.
    pub fn list_reminders_in_lists(&self, ids: &[String]) -> Result<Vec<Reminder>> {
        self.gate.check(&self.native, Access::Read)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let calendars: Vec<_> = self
            .native
            .calendars(EntityType::Reminder)
            .into_iter()
            .filter(|calendar| ids.contains(&calendar.calendar_identifier()))
            .collect();
        if calendars.is_empty() {
            tracing::debug!(?ids, "no reminder list matched");
            return Ok(Vec::new());
        }

        let predicate = self.native.predicate_for_reminders_in_calendars(&calendars);
        let fetch = |completion| self.native.fetch_reminders(predicate, completion);
        let fetched = match self.timeout {
            Some(timeout) => bridge::invoke_with_timeout(fetch, timeout)?,
            None => bridge::invoke(fetch)?,
        };

        let total = fetched.len();
        let reminders: Vec<Reminder> = fetched
            .into_iter()
            .flatten()
            .map(|reminder| mapper::reminder_to_domain(&reminder))
            .collect();
        if reminders.len() < total {
            tracing::warn!(dropped = total - reminders.len(), "host returned null reminders");
        }
        Ok(reminders)
    }

    pub fn get_reminder(&self, id: &str) -> Result<Option<Reminder>> {
        self.gate.check(&self.native, Access::Read)?;
        Ok(self
            .native
            .reminder_with_identifier(id)
            .map(|reminder| mapper::reminder_to_domain(&reminder)))
    }

    pub fn create_reminder(&self, list_id: &str, create: &ReminderCreate) -> Result<Reminder> {
        self.gate.check(&self.native, Access::Write)?;
        let calendar = self
            .native
            .calendar_with_identifier(list_id)
            .ok_or_else(|| Error::NotFound(format!("reminder list {list_id}")))?;

        let mut reminder = self.native.new_reminder();
        reminder.set_calendar(&calendar);
        mapper::apply_reminder_create(&mut reminder, create, &self.codec)?;
        self.commit_reminder(&mut reminder)?;

        tracing::info!(
            id = %reminder.calendar_item_identifier(),
            list = %list_id,
            "created reminder"
        );
        Ok(mapper::reminder_to_domain(&reminder))
    }

    pub fn update_reminder(&self, id: &str, update: &ReminderUpdate) -> Result<Reminder> {
        self.gate.check(&self.native, Access::Read)?;
        let mut reminder = self
            .native
            .reminder_with_identifier(id)
            .ok_or_else(|| Error::NotFound(format!("reminder {id}")))?;

        mapper::apply_reminder_update(&mut reminder, update, &self.codec)?;
        self.commit_reminder(&mut reminder)?;
        Ok(mapper::reminder_to_domain(&reminder))
    }

    /// Deleting reminders is not offered.
    pub fn delete_reminder(&self, _id: &str) -> Result<()> {
        Err(Error::Unsupported("deleting reminders"))
    }

    fn commit_calendar(&self, calendar: &mut N::Calendar) -> Result<()> {
        self.native.save_calendar(calendar).map_err(|reason| {
            tracing::warn!(%reason, "saving reminder list failed");
            Error::SaveFailed("Failed to save reminder list".to_string())
        })
    }

    fn commit_reminder(&self, reminder: &mut N::Reminder) -> Result<()> {
        self.native.save_reminder(reminder).map_err(|reason| {
            tracing::warn!(%reason, "saving reminder failed");
            Error::SaveFailed("Failed to save reminder".to_string())
        })
    }
}

impl<N: NativeStore + 'static> ReminderStore<N> {
    /// [`ReminderStore::request_access`] on tokio's blocking pool.
    pub async fn request_access_async(self: Arc<Self>) -> Result<bool> {
        spawn_blocking(move || self.request_access()).await
    }

    /// [`ReminderStore::list_reminders_in_lists`] on tokio's blocking pool.
    pub async fn list_reminders_in_lists_async(self: Arc<Self>, ids: Vec<String>) -> Result<Vec<Reminder>> {
        spawn_blocking(move || self.list_reminders_in_lists(&ids)).await
    }
}

async fn spawn_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Native(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::calendar::{CalendarType, Identified, SourceType};
    use crate::calendar::memory::{MemoryCalendar, MemorySource, MemoryStore};
    use pretty_assertions::assert_eq;

    fn source() -> MemorySource {
        MemorySource::new("src-1", "On My Mac", SourceType::Local)
    }

    fn store() -> ReminderStore<MemoryStore> {
        let native = MemoryStore::builder()
            .source(source())
            .calendar(MemoryCalendar::existing("list-1", "Inbox", &source()))
            .time_zone("Europe/Berlin")
            .build();
        ReminderStore::new(native)
    }

    #[test]
    fn codec_uses_host_zone() {
        assert_eq!(store().codec().zone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn unknown_host_zone_falls_back_to_utc() {
        let native = MemoryStore::builder().time_zone("Nowhere/Special").build();
        assert_eq!(ReminderStore::new(native).codec().zone(), Tz::UTC);
    }

    #[test]
    fn lists_are_mapped() {
        let lists = store().list_reminder_lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].id, "list-1");
        assert_eq!(lists[0].list_type, CalendarType::Local);
    }

    #[test]
    fn missing_source_is_not_found() {
        let store = store();
        let create = ReminderListCreate {
            title: "Groceries".into(),
            color: None,
            source: Identified { id: "nope".into() },
        };
        assert_eq!(
            store.create_reminder_list(&create),
            Err(Error::NotFound("source nope".into()))
        );
        assert_eq!(store.native().commits(), 0);
    }

    #[test]
    fn failed_commit_is_save_failed() {
        let store = store();
        store.native().set_fail_saves(true);
        let err = store
            .update_reminder_list(
                "list-1",
                &ReminderListUpdate {
                    title: Some("Renamed".into()),
                    color: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, Error::SaveFailed("Failed to save reminder list".into()));
        assert_eq!(store.get_reminder_list("list-1").unwrap().unwrap().title, "Inbox");
    }

    #[test]
    fn empty_id_list_fetches_nothing() {
        assert_eq!(store().list_reminders_in_lists(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn deletion_is_unsupported() {
        let store = store();
        assert!(matches!(store.delete_reminder("r"), Err(Error::Unsupported(_))));
        assert!(matches!(store.delete_reminder_list("list-1"), Err(Error::Unsupported(_))));
    }

    #[test]
    fn write_only_can_create_but_not_read() {
        let native = MemoryStore::builder()
            .authorization(AuthorizationStatus::WriteOnly)
            .source(source())
            .calendar(MemoryCalendar::existing("list-1", "Inbox", &source()))
            .build();
        let store = ReminderStore::new(native);

        let created = store.create_reminder("list-1", &ReminderCreate::new("Milk")).unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(
            store.get_reminder(&created.id),
            Err(Error::Unauthorized(AuthorizationStatus::WriteOnly))
        );
    }
}
