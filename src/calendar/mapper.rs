//! Field-by-field mapping between host handles and domain records.
//!
//! Only accessors and mutators of the handles are called here; nothing is
//! saved. Caller input is validated before the first mutation so a rejected
//! update never leaves a half-applied handle behind.

use url::Url;

use super::color::Rgba;
use super::calendar::{ReminderList, ReminderListCreate, ReminderListUpdate, Source, SourceType};
use super::date::{DateComponentCodec, DateComponents, DateInput, PartialDate};
use super::native::{ColorComponents, NativeCalendar, NativeReminder, NativeSource};
use super::reminder::{Reminder, ReminderCreate, ReminderUpdate, Unsupported};
use crate::error::{Error, Result};

const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 0..=9;

pub fn source_to_domain<S: NativeSource>(source: &S) -> Source {
    Source {
        id: source.source_identifier(),
        title: source.title(),
        source_type: source.source_type(),
    }
}

pub fn reminder_list_to_domain<C: NativeCalendar>(calendar: &C) -> ReminderList {
    let id = calendar.calendar_identifier();
    let source = match calendar.source() {
        Some(source) => source_to_domain(&source),
        None => {
            tracing::warn!(calendar = %id, "reminder list has no source");
            Source {
                id: String::new(),
                title: String::new(),
                source_type: SourceType::Local,
            }
        }
    };

    ReminderList {
        id,
        list_type: calendar.calendar_type(),
        title: calendar.title(),
        color: calendar.color().map(color_to_domain).unwrap_or(Rgba::WHITE),
        is_subscribed: calendar.is_subscribed(),
        source,
    }
}

pub fn reminder_to_domain<R: NativeReminder>(reminder: &R) -> Reminder {
    let id = reminder.calendar_item_identifier();
    let notes = if reminder.has_notes() {
        Some(reminder.notes().unwrap_or_default())
    } else {
        None
    };

    Reminder {
        start_date: date_from_native(&id, "start_date", reminder.start_date_components()),
        due_date: date_from_native(&id, "due_date", reminder.due_date_components()),
        url: url_from_native(&id, reminder.url()),
        title: reminder.title().unwrap_or_default(),
        is_completed: reminder.is_completed(),
        completion_date: reminder.completion_date(),
        priority: reminder.priority(),
        location: reminder.location(),
        notes,
        alarms: Unsupported,
        recurrence_rules: Unsupported,
        id,
    }
}

pub fn color_to_domain(color: ColorComponents) -> Rgba {
    Rgba {
        r: color.red,
        g: color.green,
        b: color.blue,
        a: color.alpha,
    }
}

pub fn color_to_native(color: Rgba) -> ColorComponents {
    ColorComponents {
        red: color.r,
        green: color.g,
        blue: color.b,
        alpha: color.a,
    }
}

pub fn apply_list_create<C: NativeCalendar>(calendar: &mut C, create: &ReminderListCreate) {
    calendar.set_title(&create.title);
    if let Some(color) = create.color {
        calendar.set_color(color_to_native(color));
    }
}

pub fn apply_list_update<C: NativeCalendar>(calendar: &mut C, update: &ReminderListUpdate) {
    if let Some(title) = &update.title {
        calendar.set_title(title);
    }
    if let Some(color) = update.color {
        calendar.set_color(color_to_native(color));
    }
}

pub fn apply_reminder_create<R: NativeReminder>(
    reminder: &mut R,
    create: &ReminderCreate,
    codec: &DateComponentCodec,
) -> Result<()> {
    validate_priority(create.priority)?;
    if let Some(url) = &create.url {
        validate_url(url)?;
    }
    let start = date_to_native(create.start_date.as_ref(), codec)?;
    let due = date_to_native(create.due_date.as_ref(), codec)?;

    reminder.set_title(&create.title);
    if start.is_some() {
        reminder.set_start_date_components(start);
    }
    if due.is_some() {
        reminder.set_due_date_components(due);
    }
    reminder.set_priority(create.priority);
    if let Some(location) = &create.location {
        reminder.set_location(Some(location));
    }
    if let Some(url) = &create.url {
        reminder.set_url(Some(url));
    }
    if let Some(notes) = &create.notes {
        reminder.set_notes(Some(notes));
    }
    Ok(())
}

pub fn apply_reminder_update<R: NativeReminder>(
    reminder: &mut R,
    update: &ReminderUpdate,
    codec: &DateComponentCodec,
) -> Result<()> {
    if let Some(priority) = update.priority {
        validate_priority(priority)?;
    }
    if let Some(url) = &update.url {
        validate_url(url)?;
    }
    let start = date_to_native(update.start_date.as_ref(), codec)?;
    let due = date_to_native(update.due_date.as_ref(), codec)?;

    if let Some(title) = &update.title {
        reminder.set_title(title);
    }
    if start.is_some() {
        reminder.set_start_date_components(start);
    }
    if due.is_some() {
        reminder.set_due_date_components(due);
    }
    if let Some(completed) = update.is_completed {
        reminder.set_completed(completed);
    }
    if let Some(priority) = update.priority {
        reminder.set_priority(priority);
    }
    if let Some(location) = &update.location {
        reminder.set_location(Some(location));
    }
    if let Some(url) = &update.url {
        reminder.set_url(Some(url));
    }
    if let Some(notes) = &update.notes {
        reminder.set_notes(Some(notes));
    }
    Ok(())
}

fn validate_priority(priority: i64) -> Result<()> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "priority must be within 0..=9, got {priority}"
        )))
    }
}

/// Input URLs must parse but are stored as given.
fn validate_url(raw: &str) -> Result<()> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| Error::InvalidInput(format!("invalid url '{raw}': {e}")))
}

fn date_to_native(
    input: Option<&DateInput>,
    codec: &DateComponentCodec,
) -> Result<Option<DateComponents>> {
    input.map(|input| input.to_components(codec)).transpose()
}

// The host's URL accessor is unreliable; anything unparsable reads as absent.
fn url_from_native(id: &str, raw: Option<String>) -> Option<String> {
    let raw = raw?;
    match Url::parse(&raw) {
        Ok(_) => Some(raw),
        Err(e) => {
            tracing::warn!(reminder = %id, url = %raw, error = %e, "ignoring unparsable reminder url");
            None
        }
    }
}

fn date_from_native(
    id: &str,
    field: &'static str,
    components: Option<DateComponents>,
) -> Option<PartialDate> {
    let date = PartialDate::from_components(&components?)?;
    match date.validate() {
        Ok(()) => Some(date),
        Err(e) => {
            tracing::warn!(reminder = %id, field, error = %e, "dropping invalid reminder date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::calendar::CalendarType;
    use crate::calendar::memory::{MemoryCalendar, MemoryReminder, MemorySource};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Europe::Berlin;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn codec() -> DateComponentCodec {
        DateComponentCodec::new(Berlin)
    }

    fn local_source() -> MemorySource {
        MemorySource::new("src-1", "On My Mac", SourceType::Local)
    }

    #[test]
    fn maps_list_fields() {
        let mut calendar = MemoryCalendar::new(CalendarType::Caldav);
        calendar.set_title("Errands");
        calendar.set_source(&local_source());
        calendar.set_color(ColorComponents {
            red: 0.25,
            green: 0.5,
            blue: 0.75,
            alpha: 1.0,
        });

        let list = reminder_list_to_domain(&calendar);
        assert_eq!(list.title, "Errands");
        assert_eq!(list.list_type, CalendarType::Caldav);
        assert_eq!(list.color, Rgba { r: 0.25, g: 0.5, b: 0.75, a: 1.0 });
        assert_eq!(list.source.id, "src-1");
        assert!(!list.is_subscribed);
    }

    #[test]
    fn missing_color_reads_as_white() {
        let calendar = MemoryCalendar::new(CalendarType::Local);
        assert_eq!(reminder_list_to_domain(&calendar).color, Rgba::WHITE);
    }

    #[test]
    fn notes_follow_the_has_notes_flag() {
        let mut reminder = MemoryReminder::default();
        assert_eq!(reminder_to_domain(&reminder).notes, None);

        reminder.set_notes(Some(""));
        assert_eq!(reminder_to_domain(&reminder).notes, Some(String::new()));
    }

    #[test]
    fn unparsable_url_reads_as_none() {
        let mut reminder = MemoryReminder::default();
        reminder.set_url(Some("not a url"));
        assert_eq!(reminder_to_domain(&reminder).url, None);

        reminder.set_url(Some("https://example.com/list"));
        assert_eq!(
            reminder_to_domain(&reminder).url.as_deref(),
            Some("https://example.com/list")
        );
    }

    #[test]
    fn underspecified_native_dates_read_as_none() {
        let mut reminder = MemoryReminder::default();
        reminder.set_due_date_components(Some(DateComponents {
            calendar: None,
            year: Some(2024),
            month: Some(1),
            day: Some(2),
            ..DateComponents::default()
        }));
        assert_eq!(reminder_to_domain(&reminder).due_date, None);
    }

    #[test]
    fn create_encodes_instants_as_local_wall_clock() {
        let mut reminder = MemoryReminder::default();
        let mut create = ReminderCreate::new("Dentist");
        create.due_date = Some(Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap().into());
        apply_reminder_create(&mut reminder, &create, &codec()).unwrap();

        let due = reminder_to_domain(&reminder).due_date.unwrap();
        assert_eq!((due.year, due.month, due.day, due.hour), (2024, 7, 1, Some(8)));
        assert_eq!(due.time_zone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn create_keeps_floating_dates_floating() {
        let mut reminder = MemoryReminder::default();
        let floating = PartialDate::date_only(NaiveDate::from_ymd_opt(2024, 12, 24).unwrap());
        let mut create = ReminderCreate::new("Wrap gifts");
        create.start_date = Some(floating.clone().into());
        apply_reminder_create(&mut reminder, &create, &codec()).unwrap();

        assert_eq!(reminder_to_domain(&reminder).start_date, Some(floating));
    }

    #[test]
    fn rejected_update_leaves_handle_untouched() {
        let mut reminder = MemoryReminder::default();
        reminder.set_title("Original");
        let update = ReminderUpdate {
            title: Some("Changed".into()),
            priority: Some(12),
            ..ReminderUpdate::default()
        };

        let err = apply_reminder_update(&mut reminder, &update, &codec()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(reminder.title().as_deref(), Some("Original"));
    }

    #[test]
    fn invalid_url_input_is_rejected() {
        let mut reminder = MemoryReminder::default();
        let mut create = ReminderCreate::new("Read later");
        create.url = Some("::nope".into());
        assert!(matches!(
            apply_reminder_create(&mut reminder, &create, &codec()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn url_input_is_stored_as_given() {
        let mut reminder = MemoryReminder::default();
        let mut create = ReminderCreate::new("Read later");
        create.url = Some("https://example.com".into());
        apply_reminder_create(&mut reminder, &create, &codec()).unwrap();
        assert_eq!(reminder.url().as_deref(), Some("https://example.com"));
        assert_eq!(
            reminder_to_domain(&reminder).url.as_deref(),
            Some("https://example.com")
        );

        let update = ReminderUpdate {
            url: Some("HTTPS://Example.com/a/../b".into()),
            ..ReminderUpdate::default()
        };
        apply_reminder_update(&mut reminder, &update, &codec()).unwrap();
        assert_eq!(reminder.url().as_deref(), Some("HTTPS://Example.com/a/../b"));
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut reminder = MemoryReminder::default();
        reminder.set_title("Keep");
        reminder.set_priority(5);
        let before = reminder_to_domain(&reminder);

        apply_reminder_update(&mut reminder, &ReminderUpdate::default(), &codec()).unwrap();
        assert_eq!(reminder_to_domain(&reminder), before);
    }

    proptest! {
        #[test]
        fn color_read_is_identity(r in 0.0f64..=1.0, g in 0.0f64..=1.0, b in 0.0f64..=1.0, a in 0.0f64..=1.0) {
            let mut calendar = MemoryCalendar::new(CalendarType::Local);
            calendar.set_color(ColorComponents { red: r, green: g, blue: b, alpha: a });
            let color = reminder_list_to_domain(&calendar).color;
            prop_assert_eq!(color, Rgba { r, g, b, a });
        }
    }
}
