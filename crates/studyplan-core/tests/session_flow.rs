//! Session wired to the in-memory store: feeds, resubscription and
//! write-through actions.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use studyplan_core::store::{ExclusionStore, IntervalStore, PatternStore, TaskStore};
use studyplan_core::week::slot_key;
use studyplan_core::{
    BasePattern, BlockKind, Clock, CoreError, MemoryStore, ScheduleState, Session, Slot,
    StoreError, Task, TaskOrder, WeekId,
};

/// Wednesday 2026-03-18 10:00.
fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 18)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn session_with(state: ScheduleState) -> (MemoryStore, Session<MemoryStore>) {
    let store = MemoryStore::seeded(state);
    let session = Session::connect(store.clone(), Clock::pinned_at(now()));
    (store, session)
}

#[test]
fn connect_materializes_seeded_state() {
    let mut seed = ScheduleState::new();
    seed.pattern = BasePattern::from_slots([Slot::new(3, 9).unwrap()]);
    seed.tasks = vec![Task::new("t1", "Read", now().date(), 1.0)];

    let (store, session) = session_with(seed);

    assert_eq!(session.state().pattern.len(), 1);
    assert_eq!(session.state().tasks.len(), 1);
    assert_eq!(session.watched_week(), Some(WeekId::of(now())));
    // intervals, pattern, tasks and one exclusion feed
    assert_eq!(store.subscriber_count(), 4);
}

#[test]
fn writes_come_back_through_the_feeds() {
    let (_store, session) = session_with(ScheduleState::new());
    let slot = Slot::new(3, 14).unwrap();

    assert!(session.toggle_pattern_slot(slot).unwrap());
    assert_eq!(session.classify_slot(0, slot).unwrap(), Some(BlockKind::Base));

    session.set_slot_excluded(0, slot, true).unwrap();
    assert_eq!(session.classify_slot(0, slot).unwrap(), None);
    // other weeks keep the pattern
    assert_eq!(session.classify_slot(1, slot).unwrap(), Some(BlockKind::Base));

    session.set_slot_excluded(0, slot, false).unwrap();
    let id = session.pin_slot(0, slot).unwrap();
    assert_eq!(
        session.classify_slot(0, slot).unwrap(),
        Some(BlockKind::Persisted { id: id.clone() })
    );
    assert_eq!(session.visible_week_blocks(0).unwrap().len(), 1);

    session.delete_interval(&id).unwrap();
    assert_eq!(session.classify_slot(0, slot).unwrap(), Some(BlockKind::Base));

    assert!(!session.toggle_pattern_slot(slot).unwrap());
    assert!(session.state().pattern.is_empty());
}

#[test]
fn resubscribe_cancels_previous_exclusion_feed() {
    let (store, mut session) = session_with(ScheduleState::new());
    let this_week = WeekId::of(now());
    let first = session.resubscribe(this_week);
    assert_eq!(store.subscriber_count(), 4);

    let next = session.watch_week(1).unwrap();
    assert!(!first.is_active());
    assert_eq!(session.watched_week(), Some(next.week_id()));
    assert_eq!(store.subscriber_count(), 4);

    // the old week no longer feeds the state
    store
        .toggle(this_week, slot_key(this_week.start(), Slot::new(0, 9).unwrap()), true)
        .unwrap();
    assert!(session.state().exclusions.for_week(&this_week).is_empty());

    store
        .toggle(next.week_id(), slot_key(next.start, Slot::new(0, 9).unwrap()), true)
        .unwrap();
    assert_eq!(session.state().exclusions.for_week(&next.week_id()).len(), 1);
}

#[test]
fn refresh_exclusions_fetches_unwatched_weeks() {
    let (store, session) = session_with(ScheduleState::new());
    let next = session.week(1).unwrap().week_id();
    store
        .toggle(next, slot_key(next.start(), Slot::new(1, 8).unwrap()), true)
        .unwrap();
    assert!(session.state().exclusions.for_week(&next).is_empty());

    session.refresh_exclusions([next]).unwrap();
    assert_eq!(session.state().exclusions.for_week(&next).len(), 1);
}

#[test]
fn ranking_follows_task_feed() {
    let (_store, session) = session_with(ScheduleState::new());
    let today = now().date();
    session.add_interval(now(), now() + Duration::hours(4)).unwrap();
    session
        .add_task(Task::new("easy", "Easy", today, 0.5).with_importance(1))
        .unwrap();
    session
        .add_task(Task::new("hard", "Hard", today, 3.0).with_importance(4))
        .unwrap();

    let ranked = session.rank_tasks(TaskOrder::Priority, false).unwrap();
    let ids: Vec<&str> = ranked.iter().map(|r| r.task.id.as_str()).collect();
    assert_eq!(ids, vec!["hard", "easy"]);

    session.set_task_completed("hard", true).unwrap();
    assert_eq!(session.rank_tasks(TaskOrder::Priority, false).unwrap().len(), 1);
    assert_eq!(session.rank_tasks(TaskOrder::Priority, true).unwrap().len(), 2);

    session.delete_task("hard").unwrap();
    assert_eq!(session.state().tasks.len(), 1);
}

#[test]
fn store_errors_surface_as_core_errors() {
    let (_store, session) = session_with(ScheduleState::new());
    assert!(matches!(
        session.delete_task("missing"),
        Err(CoreError::Store(StoreError::NotFound { .. }))
    ));
    assert!(matches!(
        session.add_interval(now(), now()),
        Err(CoreError::Store(StoreError::Rejected(_)))
    ));
}

#[test]
fn dropping_session_releases_feeds() {
    let store = MemoryStore::new();
    {
        let _session = Session::connect(store.clone(), Clock::pinned_at(now()));
        assert_eq!(store.subscriber_count(), 4);
    }
    assert_eq!(store.subscriber_count(), 0);

    // the store is still usable on its own
    PatternStore::save(&store, &BasePattern::from_slots([Slot::new(0, 0).unwrap()])).unwrap();
    assert_eq!(PatternStore::get(&store).unwrap().len(), 1);
    assert!(IntervalStore::list(&store).unwrap().is_empty());
    assert!(TaskStore::list(&store).unwrap().is_empty());
    assert!(ExclusionStore::get(&store, WeekId::of(now())).unwrap().is_empty());
}

#[test]
fn week_offsets_past_the_calendar_are_errors() {
    let (_store, mut session) = session_with(ScheduleState::new());
    let slot = Slot::new(0, 9).unwrap();

    assert!(matches!(
        session.week_summary(1_000_000_000),
        Err(CoreError::Validation(_))
    ));
    assert!(session.classify_slot(i64::MIN, slot).is_err());
    assert!(session.watch_week(i64::MAX).is_err());
    // the previous feed is kept when the new week cannot be computed
    assert_eq!(session.watched_week(), Some(WeekId::of(now())));
    assert!(session.pin_slot(-1_000_000_000, slot).is_err());
}

#[test]
fn far_deadline_ranking_counts_later_weeks_exclusions() {
    let mut seed = ScheduleState::new();
    let slot = Slot::new(0, 9).unwrap();
    seed.pattern = BasePattern::from_slots([slot]);
    // due Monday three weeks out; two of the three Mondays are excluded
    let due = NaiveDate::from_ymd_opt(2026, 4, 6).unwrap();
    seed.tasks = vec![Task::new("t1", "Project", due, 1.0)];
    let (store, session) = session_with(seed);
    for monday in ["2026-03-23", "2026-04-06"] {
        let week: WeekId = monday.parse().unwrap();
        store.toggle(week, slot_key(week.start(), slot), true).unwrap();
    }

    let ranked = session.rank_tasks(TaskOrder::Priority, false).unwrap();
    assert_eq!(ranked[0].priority.time_available_hours, 1.0);
}
