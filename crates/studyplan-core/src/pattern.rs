//! Recurring weekly availability pattern and per-week exclusions.
//!
//! The base pattern is global: a set of `(weekday, hour)` slots with no
//! week affinity. Exclusions are per week and hold the [`SlotKey`]s of
//! pattern slots suppressed for that week only. An exclusion whose slot is
//! no longer patterned is inert and is kept as-is.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::week::{slot_key, slot_start, start_of_week, Slot, SlotKey, WeekId};

/// The user's recurring weekly availability template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasePattern {
    slots: Vec<Slot>,
}

impl BasePattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list that may contain duplicates; the first occurrence
    /// of each slot is kept.
    pub fn from_slots<I: IntoIterator<Item = Slot>>(slots: I) -> Self {
        let mut pattern = Self::new();
        for slot in slots {
            pattern.insert(slot);
        }
        pattern
    }

    /// Remove `slot` if present, append it otherwise. Returns whether the
    /// slot is patterned afterwards.
    pub fn toggle(&mut self, slot: Slot) -> bool {
        if self.remove(slot) {
            false
        } else {
            self.slots.push(slot);
            true
        }
    }

    /// Returns false if the slot was already patterned.
    pub fn insert(&mut self, slot: Slot) -> bool {
        if self.contains(slot) {
            return false;
        }
        self.slots.push(slot);
        true
    }

    /// Returns false if the slot was not patterned.
    pub fn remove(&mut self, slot: Slot) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| *s != slot);
        self.slots.len() != before
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.contains(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Slot keys suppressed for one week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<SlotKey>);

static NO_EXCLUSIONS: ExclusionSet = ExclusionSet(BTreeSet::new());

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: SlotKey) -> bool {
        self.0.contains(&key)
    }

    /// Add or remove `key`. Idempotent: repeating the same call leaves the
    /// set unchanged.
    pub fn set_excluded(&mut self, key: SlotKey, exclude: bool) {
        if exclude {
            self.0.insert(key);
        } else {
            self.0.remove(&key);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SlotKey> for ExclusionSet {
    fn from_iter<T: IntoIterator<Item = SlotKey>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Last-known exclusion set per week.
///
/// Incoming snapshots replace the cached set for their week wholesale; two
/// snapshots for the same week are never unioned, so a stale exclusion
/// cannot come back after out-of-order delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionCache(BTreeMap<WeekId, ExclusionSet>);

impl ExclusionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `week`, returning what was cached before.
    pub fn replace(&mut self, week: WeekId, set: ExclusionSet) -> Option<ExclusionSet> {
        self.0.insert(week, set)
    }

    pub fn get(&self, week: &WeekId) -> Option<&ExclusionSet> {
        self.0.get(week)
    }

    /// Exclusions for `week`; an unknown week has none.
    pub fn for_week(&self, week: &WeekId) -> &ExclusionSet {
        self.0.get(week).unwrap_or(&NO_EXCLUSIONS)
    }

    /// Mutable set for `week`, created empty if missing.
    pub fn entry_mut(&mut self, week: WeekId) -> &mut ExclusionSet {
        self.0.entry(week).or_default()
    }

    pub fn is_excluded(&self, week: &WeekId, key: SlotKey) -> bool {
        self.for_week(week).contains(key)
    }
}

impl FromIterator<(WeekId, ExclusionSet)> for ExclusionCache {
    fn from_iter<T: IntoIterator<Item = (WeekId, ExclusionSet)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn is_patterned(pattern: &BasePattern, slot: Slot) -> bool {
    pattern.contains(slot)
}

pub fn is_excluded(exclusions: &ExclusionSet, key: SlotKey) -> bool {
    exclusions.contains(key)
}

/// Concrete one-hour intervals for every patterned slot of the week that
/// starts at `week_start`, minus the week's exclusions. Order follows the
/// pattern; callers sort if they need to.
pub fn expand(
    pattern: &BasePattern,
    exclusions: &ExclusionSet,
    week_start: NaiveDateTime,
) -> Vec<Interval> {
    pattern
        .iter()
        .filter(|slot| !exclusions.contains(slot_key(week_start, *slot)))
        .map(|slot| Interval::hour_from(slot_start(week_start, slot)))
        .collect()
}

/// Like [`expand`], restricted to the slots falling on `date`, with the
/// exclusions looked up for the week `date` belongs to.
pub fn expand_day(pattern: &BasePattern, cache: &ExclusionCache, date: NaiveDate) -> Vec<Interval> {
    let weekday = date.weekday().num_days_from_monday() as u8;
    let week_start = start_of_week(date.and_time(NaiveTime::MIN));
    let exclusions = cache.for_week(&WeekId::of(week_start));

    pattern
        .iter()
        .filter(|slot| slot.weekday() == weekday)
        .filter(|slot| !exclusions.contains(slot_key(week_start, *slot)))
        .map(|slot| Interval::hour_from(slot_start(week_start, slot)))
        .collect()
}
