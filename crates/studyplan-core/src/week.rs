//! Monday-anchored week arithmetic and the hour-slot grid.
//!
//! A week runs from Monday 00:00:00.000 to the next Monday, half-open.
//! Weekdays are numbered from Monday = 0 to Sunday = 6.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Monday 00:00 of the week containing `instant`. Sunday belongs to the
/// week that started six days earlier.
pub fn start_of_week(instant: NaiveDateTime) -> NaiveDateTime {
    let date = instant.date();
    let back = u64::from(date.weekday().num_days_from_monday());
    // NaiveDate::MIN is the only date this can fail for
    let monday = date.checked_sub_days(Days::new(back)).unwrap_or(date);
    monday.and_time(NaiveTime::MIN)
}

/// A half-open `[start, end)` week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WeekRange {
    /// The week containing `instant`.
    pub fn containing(instant: NaiveDateTime) -> Self {
        let start = start_of_week(instant);
        Self {
            start,
            end: start + Duration::days(7),
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn week_id(&self) -> WeekId {
        WeekId(self.start.date())
    }

    /// The week `n` weeks after this one (negative for earlier weeks).
    ///
    /// # Errors
    /// Returns an error if the shifted week falls outside the representable
    /// calendar.
    pub fn shifted(&self, n: i64) -> Result<Self, ValidationError> {
        let out_of_range = || ValidationError::InvalidValue {
            field: "week_offset".into(),
            message: format!("{n} weeks from {} is out of range", self.week_id()),
        };
        let start = n
            .checked_mul(7)
            .and_then(Duration::try_days)
            .and_then(|shift| self.start.checked_add_signed(shift))
            .ok_or_else(out_of_range)?;
        let end = start
            .checked_add_signed(Duration::days(7))
            .ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }
}

/// The week `week_offset` weeks away from the one containing `now`.
/// 0 is the current week, +1 next week, -1 the previous one.
pub fn week_range(now: NaiveDateTime, week_offset: i64) -> Result<WeekRange, ValidationError> {
    WeekRange::containing(now).shifted(week_offset)
}

/// Stable per-week key: the Monday of the week, printed `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WeekId(NaiveDate);

impl WeekId {
    pub fn of(instant: NaiveDateTime) -> Self {
        Self(start_of_week(instant).date())
    }

    pub fn monday(&self) -> NaiveDate {
        self.0
    }

    pub fn start(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for WeekId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
            ValidationError::InvalidValue {
                field: "week_id".into(),
                message: format!("'{s}': {e}"),
            }
        })?;
        if date.weekday().num_days_from_monday() != 0 {
            return Err(ValidationError::InvalidValue {
                field: "week_id".into(),
                message: format!("'{s}' is not a Monday"),
            });
        }
        Ok(Self(date))
    }
}

impl From<WeekId> for String {
    fn from(id: WeekId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for WeekId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One hour of one weekday on the weekly grid.
///
/// Construction rejects weekday > 6 or hour > 23, so every `Slot` in the
/// system addresses a real cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSlot")]
pub struct Slot {
    weekday: u8,
    hour: u8,
}

#[derive(Deserialize)]
struct RawSlot {
    weekday: u8,
    hour: u8,
}

impl TryFrom<RawSlot> for Slot {
    type Error = ValidationError;

    fn try_from(raw: RawSlot) -> Result<Self, Self::Error> {
        Slot::new(raw.weekday, raw.hour)
    }
}

impl Slot {
    pub fn new(weekday: u8, hour: u8) -> Result<Self, ValidationError> {
        if weekday > 6 || hour > 23 {
            return Err(ValidationError::InvalidSlot { weekday, hour });
        }
        Ok(Self { weekday, hour })
    }

    /// The slot an instant falls into.
    pub fn containing(instant: NaiveDateTime) -> Self {
        Self {
            weekday: instant.weekday().num_days_from_monday() as u8,
            hour: instant.hour() as u8,
        }
    }

    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        write!(f, "{} {:02}:00", NAMES[self.weekday as usize], self.hour)
    }
}

/// Millisecond timestamp of a slot's start within one concrete week.
///
/// The wall-clock time is read as if it were UTC, so equal inputs always
/// produce bit-equal keys regardless of the host timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(i64);

impl SlotKey {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn millis(&self) -> i64 {
        self.0
    }

    pub fn from_instant(instant: NaiveDateTime) -> Self {
        Self(instant.and_utc().timestamp_millis())
    }

    pub fn to_instant(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.0).map(|dt| dt.naive_utc())
    }
}

/// Start of `slot` in the week beginning at `week_start`.
pub fn slot_start(week_start: NaiveDateTime, slot: Slot) -> NaiveDateTime {
    let day = week_start.date() + Days::new(u64::from(slot.weekday));
    // hour is validated to 0..=23
    day.and_time(NaiveTime::from_hms_opt(u32::from(slot.hour), 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Key of `slot` in the week beginning at `week_start`.
pub fn slot_key(week_start: NaiveDateTime, slot: Slot) -> SlotKey {
    SlotKey::from_instant(slot_start(week_start, slot))
}
