//! EventKit backend.

use block2::RcBlock;
use chrono::{DateTime, Utc};
use objc2::encode::{Encoding, RefEncode};
use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_event_kit::{
    EKAuthorizationStatus, EKCalendar, EKEntityType, EKEventStore, EKReminder, EKSource,
};
use objc2_foundation::{
    NSArray, NSCalendar, NSCalendarIdentifierGregorian, NSDate, NSDateComponents, NSError,
    NSInteger, NSString, NSTimeZone, NSURL,
};

use super::authorization::{AuthorizationStatus, EntityType};
use super::bridge::Completion;
use super::calendar::{CalendarType, SourceType};
use super::date::{utc_from_unix_seconds, CalendarSystem, DateComponents};
use super::native::{ColorComponents, NativeCalendar, NativeReminder, NativeSource, NativeStore};

/// Seconds between Unix epoch (1970-01-01) and NSDate reference date (2001-01-01)
const NSDATE_UNIX_OFFSET: f64 = 978307200.0;

/// Marks an unset NSDateComponents field.
const UNDEFINED_COMPONENT: NSInteger = NSInteger::MAX;

#[repr(C)]
struct CGColor {
    _private: [u8; 0],
}

unsafe impl RefEncode for CGColor {
    const ENCODING_REF: Encoding = Encoding::Pointer(&Encoding::Struct("CGColor", &[]));
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGColorCreateSRGB(red: f64, green: f64, blue: f64, alpha: f64) -> *mut CGColor;
    fn CGColorRelease(color: *mut CGColor);
    fn CGColorGetNumberOfComponents(color: *const CGColor) -> usize;
    fn CGColorGetComponents(color: *const CGColor) -> *const f64;
}

pub struct EventKitStore {
    store: Retained<EKEventStore>,
}

// SAFETY: EKEventStore is documented as usable from any thread once created;
// the store never hands out the raw object.
unsafe impl Send for EventKitStore {}
unsafe impl Sync for EventKitStore {}

impl EventKitStore {
    pub fn new() -> Self {
        let store = unsafe { EKEventStore::new() };
        Self { store }
    }
}

impl Default for EventKitStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventKitSource(Retained<EKSource>);

impl NativeSource for EventKitSource {
    fn source_identifier(&self) -> String {
        unsafe { self.0.sourceIdentifier().to_string() }
    }

    fn title(&self) -> String {
        unsafe { self.0.title().to_string() }
    }

    fn source_type(&self) -> SourceType {
        let code = unsafe { self.0.sourceType() }.0 as i64;
        SourceType::from_code(code).unwrap_or(SourceType::Local)
    }
}

pub struct EventKitCalendar(Retained<EKCalendar>);

impl NativeCalendar for EventKitCalendar {
    type Source = EventKitSource;

    fn calendar_identifier(&self) -> String {
        unsafe { self.0.calendarIdentifier().to_string() }
    }

    fn calendar_type(&self) -> CalendarType {
        let code = unsafe { self.0.r#type() }.0 as i64;
        CalendarType::from_code(code).unwrap_or(CalendarType::Local)
    }

    fn title(&self) -> String {
        unsafe { self.0.title().to_string() }
    }

    fn set_title(&mut self, title: &str) {
        unsafe { self.0.setTitle(&NSString::from_str(title)) };
    }

    fn color(&self) -> Option<ColorComponents> {
        unsafe {
            let cg_color: *const CGColor = msg_send![&*self.0, CGColor];
            if cg_color.is_null() || CGColorGetNumberOfComponents(cg_color) < 4 {
                return None;
            }
            let components = CGColorGetComponents(cg_color);
            Some(ColorComponents {
                red: *components,
                green: *components.add(1),
                blue: *components.add(2),
                alpha: *components.add(3),
            })
        }
    }

    fn set_color(&mut self, color: ColorComponents) {
        unsafe {
            let cg_color = CGColorCreateSRGB(color.red, color.green, color.blue, color.alpha);
            if cg_color.is_null() {
                tracing::warn!("CoreGraphics could not create a color");
                return;
            }
            let _: () = msg_send![&*self.0, setCGColor: cg_color as *const CGColor];
            CGColorRelease(cg_color);
        }
    }

    fn is_subscribed(&self) -> bool {
        unsafe { self.0.isSubscribed() }
    }

    fn source(&self) -> Option<EventKitSource> {
        unsafe { self.0.source() }.map(EventKitSource)
    }

    fn set_source(&mut self, source: &EventKitSource) {
        unsafe { self.0.setSource(Some(&source.0)) };
    }
}

pub struct EventKitReminder(Retained<EKReminder>);

impl NativeReminder for EventKitReminder {
    type Calendar = EventKitCalendar;

    fn calendar_item_identifier(&self) -> String {
        unsafe { self.0.calendarItemIdentifier().to_string() }
    }

    fn set_calendar(&mut self, calendar: &EventKitCalendar) {
        unsafe { self.0.setCalendar(Some(&calendar.0)) };
    }

    fn title(&self) -> Option<String> {
        Some(unsafe { self.0.title() }.to_string())
    }

    fn set_title(&mut self, title: &str) {
        unsafe { self.0.setTitle(Some(&NSString::from_str(title))) };
    }

    fn start_date_components(&self) -> Option<DateComponents> {
        unsafe { self.0.startDateComponents() }.map(|c| components_from_native(&c))
    }

    fn set_start_date_components(&mut self, components: Option<DateComponents>) {
        let native = components.as_ref().map(components_to_native);
        unsafe { self.0.setStartDateComponents(native.as_deref()) };
    }

    fn due_date_components(&self) -> Option<DateComponents> {
        unsafe { self.0.dueDateComponents() }.map(|c| components_from_native(&c))
    }

    fn set_due_date_components(&mut self, components: Option<DateComponents>) {
        let native = components.as_ref().map(components_to_native);
        unsafe { self.0.setDueDateComponents(native.as_deref()) };
    }

    fn is_completed(&self) -> bool {
        unsafe { self.0.isCompleted() }
    }

    fn set_completed(&mut self, completed: bool) {
        unsafe { self.0.setCompleted(completed) };
    }

    fn completion_date(&self) -> Option<DateTime<Utc>> {
        unsafe { self.0.completionDate() }.and_then(|date| nsdate_to_datetime(&date))
    }

    fn priority(&self) -> i64 {
        unsafe { self.0.priority() as i64 }
    }

    fn set_priority(&mut self, priority: i64) {
        unsafe { self.0.setPriority(priority.max(0) as usize) };
    }

    fn location(&self) -> Option<String> {
        unsafe { self.0.location() }.map(|s| s.to_string())
    }

    fn set_location(&mut self, location: Option<&str>) {
        let location = location.map(NSString::from_str);
        unsafe { self.0.setLocation(location.as_deref()) };
    }

    fn url(&self) -> Option<String> {
        let url = unsafe { self.0.URL() }?;
        unsafe { url.absoluteString() }.map(|s| s.to_string())
    }

    fn set_url(&mut self, url: Option<&str>) {
        let url = url.and_then(|u| unsafe { NSURL::URLWithString(&NSString::from_str(u)) });
        unsafe { self.0.setURL(url.as_deref()) };
    }

    fn has_notes(&self) -> bool {
        unsafe { self.0.hasNotes() }
    }

    fn notes(&self) -> Option<String> {
        unsafe { self.0.notes() }.map(|s| s.to_string())
    }

    fn set_notes(&mut self, notes: Option<&str>) {
        let notes = notes.map(NSString::from_str);
        unsafe { self.0.setNotes(notes.as_deref()) };
    }
}

impl NativeStore for EventKitStore {
    type Source = EventKitSource;
    type Calendar = EventKitCalendar;
    type Reminder = EventKitReminder;
    type Predicate = Retained<objc2_foundation::NSPredicate>;

    fn local_time_zone(&self) -> Option<String> {
        Some(unsafe { NSTimeZone::localTimeZone().name() }.to_string())
    }

    fn authorization_status(&self, entity: EntityType) -> AuthorizationStatus {
        let status = unsafe { EKEventStore::authorizationStatusForEntityType(entity_type(entity)) };
        match status {
            EKAuthorizationStatus::NotDetermined => AuthorizationStatus::NotDetermined,
            EKAuthorizationStatus::Restricted => AuthorizationStatus::Restricted,
            EKAuthorizationStatus::Denied => AuthorizationStatus::Denied,
            EKAuthorizationStatus::FullAccess => AuthorizationStatus::FullAccess,
            EKAuthorizationStatus::WriteOnly => AuthorizationStatus::WriteOnly,
            other => {
                tracing::warn!(code = other.0, "unknown authorization status");
                AuthorizationStatus::Restricted
            }
        }
    }

    fn request_full_access_to_reminders(&self, completion: Completion<bool>) {
        let block = RcBlock::new(move |granted: Bool, error: *mut NSError| {
            let error = unsafe { error.as_ref() }.map(|e| e.localizedDescription().to_string());
            completion.resolve(Some(granted.as_bool()), error);
        });

        unsafe {
            self.store
                .requestFullAccessToRemindersWithCompletion(&*block as *const _ as *mut _);
        }
    }

    fn calendars(&self, entity: EntityType) -> Vec<EventKitCalendar> {
        let ek_calendars = unsafe { self.store.calendarsForEntityType(entity_type(entity)) };
        (0..ek_calendars.len())
            .map(|i| EventKitCalendar(ek_calendars.objectAtIndex(i)))
            .collect()
    }

    fn calendar_with_identifier(&self, id: &str) -> Option<EventKitCalendar> {
        unsafe { self.store.calendarWithIdentifier(&NSString::from_str(id)) }.map(EventKitCalendar)
    }

    fn source_with_identifier(&self, id: &str) -> Option<EventKitSource> {
        unsafe { self.store.sourceWithIdentifier(&NSString::from_str(id)) }.map(EventKitSource)
    }

    fn new_calendar(&self, entity: EntityType) -> EventKitCalendar {
        EventKitCalendar(unsafe {
            EKCalendar::calendarForEntityType_eventStore(entity_type(entity), &self.store)
        })
    }

    fn save_calendar(&self, calendar: &mut EventKitCalendar) -> Result<(), String> {
        unsafe { self.store.saveCalendar_commit_error(&calendar.0, true) }
            .map_err(|e| e.localizedDescription().to_string())
    }

    fn predicate_for_reminders_in_calendars(&self, calendars: &[EventKitCalendar]) -> Self::Predicate {
        let retained: Vec<Retained<EKCalendar>> = calendars.iter().map(|c| c.0.clone()).collect();
        let array = NSArray::from_retained_slice(&retained);
        unsafe { self.store.predicateForRemindersInCalendars(Some(&array)) }
    }

    fn fetch_reminders(
        &self,
        predicate: Self::Predicate,
        completion: Completion<Vec<Option<EventKitReminder>>>,
    ) {
        let block = RcBlock::new(move |reminders: *mut NSArray<EKReminder>| {
            let Some(reminders) = (unsafe { reminders.as_ref() }) else {
                completion.resolve(None, None);
                return;
            };
            let found = (0..reminders.len())
                .map(|i| Some(EventKitReminder(reminders.objectAtIndex(i))))
                .collect();
            completion.succeed(found);
        });

        unsafe {
            self.store
                .fetchRemindersMatchingPredicate_completion(&predicate, &block);
        }
    }

    fn reminder_with_identifier(&self, id: &str) -> Option<EventKitReminder> {
        let item = unsafe { self.store.calendarItemWithIdentifier(&NSString::from_str(id)) }?;
        item.downcast::<EKReminder>().ok().map(EventKitReminder)
    }

    fn new_reminder(&self) -> EventKitReminder {
        EventKitReminder(unsafe { EKReminder::reminderWithEventStore(&self.store) })
    }

    fn save_reminder(&self, reminder: &mut EventKitReminder) -> Result<(), String> {
        unsafe { self.store.saveReminder_commit_error(&reminder.0, true) }
            .map_err(|e| e.localizedDescription().to_string())
    }
}

fn entity_type(entity: EntityType) -> EKEntityType {
    match entity {
        EntityType::Event => EKEntityType::Event,
        EntityType::Reminder => EKEntityType::Reminder,
    }
}

fn components_from_native(native: &NSDateComponents) -> DateComponents {
    let field = |value: NSInteger| (value != UNDEFINED_COMPONENT).then_some(value);
    unsafe {
        let calendar = native.calendar().and_then(|calendar| {
            let identifier = calendar.calendarIdentifier();
            if &*identifier == NSCalendarIdentifierGregorian {
                Some(CalendarSystem::Gregorian)
            } else {
                tracing::warn!(calendar = %identifier, "unsupported reminder date calendar");
                None
            }
        });

        DateComponents {
            calendar,
            year: field(native.year()).map(|v| v as i32),
            month: field(native.month()).map(|v| v as u32),
            day: field(native.day()).map(|v| v as u32),
            hour: field(native.hour()).map(|v| v as u32),
            minute: field(native.minute()).map(|v| v as u32),
            second: field(native.second()).map(|v| v as u32),
            time_zone: native.timeZone().map(|tz| tz.name().to_string()),
        }
    }
}

fn components_to_native(components: &DateComponents) -> Retained<NSDateComponents> {
    unsafe {
        let native = NSDateComponents::new();
        if components.calendar.is_some() {
            let gregorian = NSCalendar::calendarWithIdentifier(NSCalendarIdentifierGregorian);
            native.setCalendar(gregorian.as_deref());
        }
        if let Some(year) = components.year {
            native.setYear(year as NSInteger);
        }
        if let Some(month) = components.month {
            native.setMonth(month as NSInteger);
        }
        if let Some(day) = components.day {
            native.setDay(day as NSInteger);
        }
        if let Some(hour) = components.hour {
            native.setHour(hour as NSInteger);
        }
        if let Some(minute) = components.minute {
            native.setMinute(minute as NSInteger);
        }
        if let Some(second) = components.second {
            native.setSecond(second as NSInteger);
        }
        if let Some(name) = &components.time_zone {
            let zone = NSTimeZone::timeZoneWithName(&NSString::from_str(name));
            native.setTimeZone(zone.as_deref());
        }
        native
    }
}

fn nsdate_to_datetime(date: &NSDate) -> Option<DateTime<Utc>> {
    let nsdate_ts = unsafe { date.timeIntervalSinceReferenceDate() };
    let unix_ts = nsdate_ts + NSDATE_UNIX_OFFSET;
    utc_from_unix_seconds(unix_ts)
}
