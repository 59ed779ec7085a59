//! Conversion between absolute instants and calendar date components.
//!
//! Reminder start and due dates are stored by the host as date components: a
//! year/month/day/time tuple with an optional reference calendar and an
//! optional time zone. Components without a time zone are *floating*; they mean
//! "this wall-clock time wherever the reader happens to be" and have no fixed
//! instant. The codec is built for an evaluation zone, normally the host's
//! local zone, which it uses in both directions:
//!
//! * encoding narrows an instant to wall-clock fields in the evaluation zone
//!   and tags them with that zone's name, so an instant created elsewhere is
//!   stored shifted to local wall-clock time;
//! * decoding resolves floating components in the evaluation zone. That is an
//!   approximation that only holds for the zone in effect at read time.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reference calendar attached to a set of date components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSystem {
    Gregorian,
}

/// Date components as the host stores them. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateComponents {
    pub calendar: Option<CalendarSystem>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub time_zone: Option<String>,
}

/// A reminder date that is not an instant.
///
/// `hour` being absent means the date is a whole day. `time_zone` being absent
/// means the date is floating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<u32>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl PartialDate {
    /// A floating date and time.
    pub fn floating(at: NaiveDateTime) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
            day: at.day(),
            hour: Some(at.hour()),
            minute: Some(at.minute()),
            second: Some(at.second()),
            time_zone: None,
        }
    }

    /// A floating whole-day date.
    pub fn date_only(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: None,
            minute: None,
            second: None,
            time_zone: None,
        }
    }

    pub fn in_zone(mut self, zone: Tz) -> Self {
        self.time_zone = Some(zone.name().to_string());
        self
    }

    pub fn is_floating(&self) -> bool {
        self.time_zone.is_none()
    }

    /// Wall-clock fields as a naive date time, missing time fields as zero.
    pub fn naive(&self) -> Result<NaiveDateTime> {
        naive_from_fields(
            self.year,
            self.month,
            self.day,
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.hour.is_none() && (self.minute.is_some() || self.second.is_some()) {
            return Err(Error::InvalidDateComponents(format!(
                "{self} has minutes or seconds without an hour"
            )));
        }
        self.naive()?;
        if let Some(name) = &self.time_zone {
            parse_zone(name)?;
        }
        Ok(())
    }

    pub fn to_components(&self) -> DateComponents {
        DateComponents {
            calendar: Some(CalendarSystem::Gregorian),
            year: Some(self.year),
            month: Some(self.month),
            day: Some(self.day),
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            time_zone: self.time_zone.clone(),
        }
    }

    /// Read components back into a partial date. Components without a
    /// reference calendar or without a full year/month/day are underspecified
    /// and yield `None`.
    pub fn from_components(components: &DateComponents) -> Option<Self> {
        components.calendar?;
        Some(Self {
            year: components.year?,
            month: components.month?,
            day: components.day?,
            hour: components.hour,
            minute: components.minute,
            second: components.second,
            time_zone: components.time_zone.clone(),
        })
    }

    /// Materialize an instant for presentation or sorting. Floating dates are
    /// resolved in the codec's evaluation zone.
    pub fn to_instant(&self, codec: &DateComponentCodec) -> Result<DateTime<FixedOffset>> {
        codec
            .decode(&self.to_components())?
            .ok_or_else(|| Error::InvalidDateComponents(format!("{self} is underspecified")))
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;
        if let Some(hour) = self.hour {
            write!(
                f,
                "T{:02}:{:02}:{:02}",
                hour,
                self.minute.unwrap_or(0),
                self.second.unwrap_or(0)
            )?;
        }
        match &self.time_zone {
            Some(zone) => write!(f, " [{zone}]"),
            None => write!(f, " [floating]"),
        }
    }
}

/// A start or due date as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// An absolute instant, narrowed to local wall-clock time on write.
    Instant(DateTime<FixedOffset>),
    /// Components stored as given.
    Partial(PartialDate),
}

impl DateInput {
    pub fn to_components(&self, codec: &DateComponentCodec) -> Result<DateComponents> {
        match self {
            DateInput::Instant(instant) => Ok(codec.encode(instant)),
            DateInput::Partial(date) => {
                date.validate()?;
                Ok(date.to_components())
            }
        }
    }
}

impl From<PartialDate> for DateInput {
    fn from(date: PartialDate) -> Self {
        DateInput::Partial(date)
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for DateInput {
    fn from(instant: DateTime<Z>) -> Self {
        DateInput::Instant(instant.fixed_offset())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateComponentCodec {
    zone: Tz,
}

impl DateComponentCodec {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn for_zone_name(name: &str) -> Result<Self> {
        parse_zone(name).map(Self::new)
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Wall-clock fields of `instant` in the evaluation zone, tagged with it.
    pub fn encode<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateComponents {
        let local = instant.with_timezone(&self.zone);
        DateComponents {
            calendar: Some(CalendarSystem::Gregorian),
            year: Some(local.year()),
            month: Some(local.month()),
            day: Some(local.day()),
            hour: Some(local.hour()),
            minute: Some(local.minute()),
            second: Some(local.second()),
            time_zone: Some(self.zone.name().to_string()),
        }
    }

    pub fn decode(&self, components: &DateComponents) -> Result<Option<DateTime<FixedOffset>>> {
        if components.calendar.is_none() {
            return Ok(None);
        }
        let (Some(year), Some(month), Some(day)) =
            (components.year, components.month, components.day)
        else {
            return Ok(None);
        };

        let naive = naive_from_fields(
            year,
            month,
            day,
            components.hour.unwrap_or(0),
            components.minute.unwrap_or(0),
            components.second.unwrap_or(0),
        )?;

        match &components.time_zone {
            Some(name) => resolve(&parse_zone(name)?, naive).map(Some),
            None => {
                tracing::trace!(
                    %naive,
                    zone = self.zone.name(),
                    "resolving floating date in evaluation zone"
                );
                resolve(&self.zone, naive).map(Some)
            }
        }
    }
}

/// Fractional Unix seconds as a UTC instant. Pre-epoch values keep their
/// sub-second part.
pub fn utc_from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::InvalidDateComponents(format!("unknown time zone '{name}'")))
}

fn naive_from_fields(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::InvalidDateComponents(format!("{year:04}-{month:02}-{day:02} is not a valid date"))
    })?;
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
        Error::InvalidDateComponents(format!("{hour:02}:{minute:02}:{second:02} is not a valid time"))
    })?;
    Ok(date.and_time(time))
}

fn resolve(zone: &Tz, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.fixed_offset()),
        // DST fold: the earlier of the two instants.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
        LocalResult::None => Err(Error::InvalidDateComponents(format!(
            "{naive} does not exist in {}",
            zone.name()
        ))),
    }
}
