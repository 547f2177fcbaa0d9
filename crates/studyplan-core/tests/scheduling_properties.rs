//! Behavioral properties of the scheduling core.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use studyplan_core::availability::{availability_until, visible_week_blocks, AvailabilitySource};
use studyplan_core::priority::{priority_for_task, priority_score, slack_margin, urgency_level};
use studyplan_core::week::slot_key;
use studyplan_core::{
    merge_intervals, BasePattern, BlockKind, ExclusionCache, ExclusionSet, Interval,
    PersistedInterval, ScheduleState, Slot, SlotKey, Task, WeekId, WeekRange,
};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 16)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn minute_span() -> impl Strategy<Value = (i64, i64)> {
    (0i64..600, 1i64..120).prop_map(|(start, len)| (start, start + len))
}

fn to_interval((start, end): (i64, i64)) -> Interval {
    Interval::new(
        base() + Duration::minutes(start),
        base() + Duration::minutes(end),
    )
}

proptest! {
    #[test]
    fn merge_is_idempotent(spans in prop::collection::vec(minute_span(), 0..20)) {
        let once = merge_intervals(spans.iter().copied().map(to_interval));
        let twice = merge_intervals(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_preserves_covered_time(spans in prop::collection::vec(minute_span(), 0..20)) {
        let mut covered = vec![false; 720];
        for &(start, end) in &spans {
            for minute in start..end {
                covered[minute as usize] = true;
            }
        }
        let expected = covered.iter().filter(|c| **c).count() as f64;

        let merged = merge_intervals(spans.iter().copied().map(to_interval));
        let total: f64 = merged.iter().map(Interval::minutes).sum();
        prop_assert!((total - expected).abs() < 1e-9);

        for pair in merged.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }
}

#[test]
fn persisted_block_suppresses_overlapping_base_block() {
    let week = WeekRange::containing(base());
    let pattern = BasePattern::from_slots([Slot::new(0, 9).unwrap()]);
    let persisted = vec![PersistedInterval::new("p1", at(16, 9), at(16, 10))];

    let blocks = visible_week_blocks(&persisted, &pattern, &ExclusionSet::new(), week);

    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].kind,
        BlockKind::Persisted {
            id: "p1".to_string()
        }
    );
}

#[test]
fn exclusion_updates_replace_previous_set() {
    let week = WeekId::of(base());
    let mut state = ScheduleState::new();
    let first: ExclusionSet = [10, 20].into_iter().map(SlotKey::from_millis).collect();
    let second: ExclusionSet = [30].into_iter().map(SlotKey::from_millis).collect();

    state.apply_exclusions(week, &first);
    state.apply_exclusions(week, &second);

    let keys: Vec<i64> = state
        .exclusions
        .for_week(&week)
        .iter()
        .map(|k| k.millis())
        .collect();
    assert_eq!(keys, vec![30]);
}

#[test]
fn urgency_boundaries_are_strict() {
    assert_eq!(urgency_level(0.14), 1);
    assert_eq!(urgency_level(0.15), 2);
    assert_eq!(urgency_level(0.29), 2);
    assert_eq!(urgency_level(0.30), 3);
    assert_eq!(urgency_level(0.59), 4);
    assert_eq!(urgency_level(0.60), 5);
}

#[test]
fn priority_and_margin_formulas() {
    assert!(approx(priority_score(2, 3), 5.4));
    assert!(approx(slack_margin(5.0, 0.0), 5000.0));
}

#[test]
fn task_due_today_with_three_free_hours() {
    let now = at(18, 10);
    let persisted = vec![PersistedInterval::new("p1", now, now + Duration::hours(3))];
    let pattern = BasePattern::new();
    let exclusions = ExclusionCache::new();
    let source = AvailabilitySource::new(&persisted, &pattern, &exclusions);
    let task = Task::new("t1", "Essay", now.date(), 2.0);

    let priority = priority_for_task(&task, now, &source);

    assert!(approx(priority.time_available_hours, 3.0));
    assert!((priority.slack_margin - 0.667).abs() < 1e-3);
    assert_eq!(priority.urgency_level, 5);
    assert!(approx(priority.score, 9.0));
}

#[test]
fn excluded_pattern_slot_is_not_visible() {
    let week = WeekRange::containing(base());
    let slot = Slot::new(0, 9).unwrap();
    let pattern = BasePattern::from_slots([slot]);
    let exclusions: ExclusionSet = [slot_key(week.start, slot)].into_iter().collect();

    let blocks = visible_week_blocks(&[], &pattern, &exclusions, week);

    assert!(blocks.iter().all(|b| b.kind != BlockKind::Base));
    assert!(blocks.is_empty());
}

#[test]
fn past_deadline_leaves_no_time() {
    let now = at(18, 10);
    let persisted = vec![PersistedInterval::new("p1", now, now + Duration::hours(3))];
    let pattern = BasePattern::from_slots([Slot::new(2, 12).unwrap()]);
    let exclusions = ExclusionCache::new();
    let source = AvailabilitySource::new(&persisted, &pattern, &exclusions);
    let yesterday = (now - Duration::days(1)).date();
    let task = Task::new("t1", "Late", yesterday, 1.0);

    let priority = priority_for_task(&task, now, &source);

    assert_eq!(priority.time_available_hours, 0.0);
    assert_eq!(priority.urgency_level, 5);
    assert_eq!(
        availability_until(task.deadline(), now, &source),
        0.0
    );
}

#[test]
fn availability_spans_weeks_with_their_own_exclusions() {
    // Sunday evening, pattern at Monday 09:00 of each week
    let now = at(22, 20);
    let slot = Slot::new(0, 9).unwrap();
    let pattern = BasePattern::from_slots([slot]);
    let next_week = WeekRange::containing(at(23, 0));
    let mut exclusions = ExclusionCache::new();
    exclusions.replace(
        next_week.week_id(),
        [slot_key(next_week.start, slot)].into_iter().collect(),
    );
    let source = AvailabilitySource::new(&[], &pattern, &exclusions);

    assert_eq!(availability_until(Some(at(24, 0)), now, &source), 0.0);

    let open = ExclusionCache::new();
    let source = AvailabilitySource::new(&[], &pattern, &open);
    assert!(approx(availability_until(Some(at(24, 0)), now, &source), 60.0));
}
