//! Availability materialization.
//!
//! Combines explicitly persisted study blocks with the base pattern's
//! derived intervals. Where both would occupy the same time, the persisted
//! block wins and the derived interval is dropped, not merged.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::interval::{covered_minutes, Interval};
use crate::pattern::{expand, BasePattern, ExclusionCache, ExclusionSet};
use crate::week::{slot_key, slot_start, Slot, WeekRange};

/// A study block the user created explicitly. Independent of the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedInterval {
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PersistedInterval {
    pub fn new(id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    /// Shares time with `other`. A block with `end <= start` occupies nothing.
    pub fn occupies(&self, other: &Interval) -> bool {
        let own = self.interval();
        !own.is_empty() && own.overlaps(other)
    }
}

/// Where a visible block comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Persisted { id: String },
    Base,
}

impl BlockKind {
    pub fn is_persisted(&self) -> bool {
        matches!(self, BlockKind::Persisted { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Persisted { .. } => "persisted",
            BlockKind::Base => "base",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            BlockKind::Persisted { .. } => 0,
            BlockKind::Base => 1,
        }
    }
}

/// An interval tagged with its origin, for grid painting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl TaggedInterval {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

fn visible_order(a: &TaggedInterval, b: &TaggedInterval) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
}

/// Blocks to paint for one week: persisted intervals overlapping the week,
/// plus pattern intervals that overlap the week and no persisted interval.
/// Sorted by start; at equal starts persisted blocks come first.
pub fn visible_week_blocks(
    persisted: &[PersistedInterval],
    pattern: &BasePattern,
    exclusions: &ExclusionSet,
    week: WeekRange,
) -> Vec<TaggedInterval> {
    let week_span = Interval::new(week.start, week.end);

    let mut blocks: Vec<TaggedInterval> = persisted
        .iter()
        .filter(|p| p.occupies(&week_span))
        .map(|p| TaggedInterval {
            start: p.start,
            end: p.end,
            kind: BlockKind::Persisted { id: p.id.clone() },
        })
        .collect();

    let base = expand(pattern, exclusions, week.start)
        .into_iter()
        .filter(|b| b.overlaps(&week_span))
        .filter(|b| !persisted.iter().any(|p| p.occupies(b)))
        .map(|b| TaggedInterval {
            start: b.start,
            end: b.end,
            kind: BlockKind::Base,
        });
    blocks.extend(base);

    blocks.sort_by(visible_order);
    tracing::trace!(week = %week.week_id(), blocks = blocks.len(), "materialized week");
    blocks
}

/// Everything needed to answer "how much free time is there?".
#[derive(Debug, Clone, Copy)]
pub struct AvailabilitySource<'a> {
    pub persisted: &'a [PersistedInterval],
    pub pattern: &'a BasePattern,
    pub exclusions: &'a ExclusionCache,
}

impl<'a> AvailabilitySource<'a> {
    pub fn new(
        persisted: &'a [PersistedInterval],
        pattern: &'a BasePattern,
        exclusions: &'a ExclusionCache,
    ) -> Self {
        Self {
            persisted,
            pattern,
            exclusions,
        }
    }

    /// See [`availability_until`].
    pub fn minutes_until(&self, deadline: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
        availability_until(deadline, now, self)
    }

    /// What occupies `slot` in `week`: a persisted block (by id), a
    /// non-excluded pattern slot, or nothing.
    pub fn classify_slot(&self, week: WeekRange, slot: Slot) -> Option<BlockKind> {
        classify_slot(self, week, slot)
    }
}

/// Availability is never counted further than this many days past `now`.
pub const HORIZON_DAYS: i64 = 366;

/// Where counting stops for `deadline`: the deadline itself, or the
/// horizon if that comes first.
pub fn availability_horizon(deadline: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    Duration::try_days(HORIZON_DAYS)
        .and_then(|span| now.checked_add_signed(span))
        .map_or(deadline, |cap| deadline.min(cap))
}

/// Free minutes between `now` and `deadline`.
///
/// Walks the window week by week. In each week the persisted blocks and
/// that week's non-excluded pattern slots are clipped to the window,
/// unioned and summed. Time is not reserved between tasks: every task sees
/// the full free time before its own deadline. A missing deadline or one at
/// or before `now` yields 0. Deadlines past [`HORIZON_DAYS`] are counted up
/// to the horizon only.
pub fn availability_until(
    deadline: Option<NaiveDateTime>,
    now: NaiveDateTime,
    source: &AvailabilitySource<'_>,
) -> f64 {
    let Some(deadline) = deadline else {
        return 0.0;
    };
    let end = availability_horizon(deadline, now);
    if end <= now {
        return 0.0;
    }

    let mut total = 0.0;
    let mut week = WeekRange::containing(now);
    while week.start < end {
        let from = week.start.max(now);
        let to = week.end.min(end);
        let persisted = source
            .persisted
            .iter()
            .filter_map(|p| p.interval().clip(from, to));
        let base = expand(
            source.pattern,
            source.exclusions.for_week(&week.week_id()),
            week.start,
        )
        .into_iter()
        .filter_map(|slot| slot.clip(from, to));
        total += covered_minutes(persisted.chain(base));

        match week.shifted(1) {
            Ok(next) => week = next,
            Err(_) => break,
        }
    }
    total
}

/// Classify one grid cell. Persisted blocks take precedence over the
/// pattern; if several persisted blocks touch the hour, the earliest wins.
pub fn classify_slot(
    source: &AvailabilitySource<'_>,
    week: WeekRange,
    slot: Slot,
) -> Option<BlockKind> {
    let cell = Interval::hour_from(slot_start(week.start, slot));

    let persisted = source
        .persisted
        .iter()
        .filter(|p| p.occupies(&cell))
        .min_by_key(|p| p.start);
    if let Some(p) = persisted {
        return Some(BlockKind::Persisted { id: p.id.clone() });
    }

    let excluded = source
        .exclusions
        .is_excluded(&week.week_id(), slot_key(week.start, slot));
    (source.pattern.contains(slot) && !excluded).then_some(BlockKind::Base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::week::WeekId;
    use chrono::{Duration, NaiveDate};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn slot(d: u8, h: u8) -> Slot {
        Slot::new(d, h).unwrap()
    }

    // 2026-03-16 is a Monday
    fn week() -> WeekRange {
        WeekRange::containing(at(16, 12, 0))
    }

    #[test]
    fn persisted_block_suppresses_overlapping_base_slot() {
        let persisted = vec![PersistedInterval::new("p1", at(16, 9, 30), at(16, 10, 30))];
        let pattern = BasePattern::from_slots([slot(0, 9), slot(0, 11)]);

        let blocks = visible_week_blocks(&persisted, &pattern, &ExclusionSet::new(), week());

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Persisted { id: "p1".into() });
        assert_eq!(blocks[1].kind, BlockKind::Base);
        assert_eq!(blocks[1].start, at(16, 11, 0));
    }

    #[test]
    fn persisted_sorts_before_base_at_equal_start() {
        let tagged = |kind| TaggedInterval {
            start: at(17, 8, 0),
            end: at(17, 9, 0),
            kind,
        };
        let mut mixed = vec![tagged(BlockKind::Base), tagged(BlockKind::Persisted { id: "x".into() })];
        mixed.sort_by(visible_order);
        assert!(mixed[0].kind.is_persisted());
    }

    #[test]
    fn partial_overlap_still_suppresses_base_slot() {
        let persisted = vec![PersistedInterval::new("p1", at(17, 8, 0), at(17, 8, 30))];
        let pattern = BasePattern::from_slots([slot(1, 8)]);
        let blocks = visible_week_blocks(&persisted, &pattern, &ExclusionSet::new(), week());
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].kind.is_persisted());
    }

    #[test]
    fn blocks_outside_week_are_not_visible() {
        let persisted = vec![
            PersistedInterval::new("before", at(15, 9, 0), at(15, 10, 0)),
            PersistedInterval::new("straddle", at(22, 23, 0), at(23, 1, 0)),
            PersistedInterval::new("after", at(23, 9, 0), at(23, 10, 0)),
        ];
        let blocks =
            visible_week_blocks(&persisted, &BasePattern::new(), &ExclusionSet::new(), week());
        let ids: Vec<_> = blocks
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::Persisted { id } => Some(id.as_str()),
                BlockKind::Base => None,
            })
            .collect();
        assert_eq!(ids, vec!["straddle"]);
    }

    #[test]
    fn availability_counts_overlap_once() {
        let now = at(16, 8, 0);
        let persisted = vec![PersistedInterval::new("p1", at(16, 9, 0), at(16, 10, 30))];
        let pattern = BasePattern::from_slots([slot(0, 9), slot(0, 14)]);
        let cache = ExclusionCache::new();
        let source = AvailabilitySource::new(&persisted, &pattern, &cache);

        let minutes = source.minutes_until(Some(at(16, 23, 59)), now);
        // 09:00-10:30 union 09:00-10:00, plus 14:00-15:00
        assert!((minutes - 150.0).abs() < 1e-9);
    }

    #[test]
    fn availability_clips_to_now_and_deadline() {
        let persisted = vec![PersistedInterval::new("p1", at(16, 9, 0), at(16, 12, 0))];
        let pattern = BasePattern::new();
        let cache = ExclusionCache::new();
        let source = AvailabilitySource::new(&persisted, &pattern, &cache);

        let minutes = source.minutes_until(Some(at(16, 11, 0)), at(16, 10, 0));
        assert!((minutes - 60.0).abs() < 1e-9);
    }

    #[test]
    fn availability_spans_weeks_with_their_own_exclusions() {
        // Monday 9am patterned; excluded only in the second week
        let pattern = BasePattern::from_slots([slot(0, 9)]);
        let second_week = week().shifted(1).unwrap();
        let mut cache = ExclusionCache::new();
        cache.replace(
            second_week.week_id(),
            [slot_key(second_week.start, slot(0, 9))].into_iter().collect(),
        );
        let source = AvailabilitySource::new(&[], &pattern, &cache);

        let minutes = source.minutes_until(Some(at(31, 23, 59)), at(16, 0, 0));
        // weeks of 16th, 23rd (excluded), 30th
        assert!((minutes - 120.0).abs() < 1e-9);
    }

    #[test]
    fn far_deadline_is_counted_up_to_horizon() {
        let every_hour: Vec<Slot> = (0..7)
            .flat_map(|d| (0..24).map(move |h| slot(d, h)))
            .collect();
        let pattern = BasePattern::from_slots(every_hour);
        let cache = ExclusionCache::new();
        let source = AvailabilitySource::new(&[], &pattern, &cache);
        let now = at(16, 0, 0);
        let far = NaiveDate::from_ymd_opt(9999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();

        assert_eq!(availability_horizon(far, now), now + Duration::days(HORIZON_DAYS));
        let minutes = source.minutes_until(Some(far), now);
        assert!((minutes - (HORIZON_DAYS * 24 * 60) as f64).abs() < 1e-6);
    }

    #[test]
    fn blocks_crossing_week_boundary_count_once() {
        let persisted = vec![PersistedInterval::new("p1", at(22, 22, 0), at(23, 2, 0))];
        let pattern = BasePattern::from_slots([slot(0, 1)]);
        let cache = ExclusionCache::new();
        let source = AvailabilitySource::new(&persisted, &pattern, &cache);

        let minutes = source.minutes_until(Some(at(23, 12, 0)), at(22, 0, 0));
        assert!((minutes - 240.0).abs() < 1e-9);
    }

    #[test]
    fn no_time_after_deadline_or_without_one() {
        let pattern = BasePattern::from_slots([slot(0, 9)]);
        let cache = ExclusionCache::new();
        let source = AvailabilitySource::new(&[], &pattern, &cache);
        let now = at(16, 8, 0);

        assert_eq!(source.minutes_until(Some(now), now), 0.0);
        assert_eq!(source.minutes_until(Some(now - Duration::hours(1)), now), 0.0);
        assert_eq!(source.minutes_until(None, now), 0.0);
    }

    #[test]
    fn classify_slot_precedence() {
        let persisted = vec![PersistedInterval::new("p1", at(16, 9, 0), at(16, 10, 0))];
        let pattern = BasePattern::from_slots([slot(0, 9), slot(0, 10), slot(0, 11)]);
        let mut cache = ExclusionCache::new();
        cache.replace(
            WeekId::of(week().start),
            [slot_key(week().start, slot(0, 11))].into_iter().collect(),
        );
        let source = AvailabilitySource::new(&persisted, &pattern, &cache);

        assert_eq!(
            source.classify_slot(week(), slot(0, 9)),
            Some(BlockKind::Persisted { id: "p1".into() })
        );
        assert_eq!(source.classify_slot(week(), slot(0, 10)), Some(BlockKind::Base));
        assert_eq!(source.classify_slot(week(), slot(0, 11)), None);
        assert_eq!(source.classify_slot(week(), slot(3, 3)), None);
    }

    #[test]
    fn tagged_interval_json_shape() {
        let block = TaggedInterval {
            start: at(16, 9, 0),
            end: at(16, 10, 0),
            kind: BlockKind::Persisted { id: "p1".into() },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["kind"], "persisted");
        assert_eq!(json["id"], "p1");
    }
}
