//! Half-open time intervals and the union/merge algorithm.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A `[start, end)` stretch of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// A one-hour interval starting at `start`.
    pub fn hour_from(start: NaiveDateTime) -> Self {
        Self::new(start, start + Duration::hours(1))
    }

    /// `end <= start`
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }

    pub fn minutes(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 60_000.0
    }

    /// True if the two share any time. Abutting intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Overlap with `[from, to)`, or `None` if nothing is left.
    pub fn clip(&self, from: NaiveDateTime, to: NaiveDateTime) -> Option<Interval> {
        let clipped = Interval::new(self.start.max(from), self.end.min(to));
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Collapse `intervals` into the minimal ascending list covering the same
/// time. Empty intervals are dropped and touching intervals (`a.end ==
/// b.start`) are joined.
pub fn merge_intervals<I>(intervals: I) -> Vec<Interval>
where
    I: IntoIterator<Item = Interval>,
{
    let mut sorted: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
    sorted.sort_by_key(|i| i.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(last) if next.start <= last.end => {
                last.end = last.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Total minutes covered by `intervals`, counting shared time once.
pub fn covered_minutes<I>(intervals: I) -> f64
where
    I: IntoIterator<Item = Interval>,
{
    merge_intervals(intervals).iter().map(Interval::minutes).sum()
}
