//! A user session wired to the external stores.
//!
//! The session owns the materialized [`ScheduleState`], the store feeds
//! that keep it current and the clock. At most one exclusion feed is live:
//! [`Session::resubscribe`] cancels the previous one before watching a new
//! week. Writes go to the stores; the state only changes when the stores
//! deliver the new value back through a feed.
//!
//! Priority queries first fetch the exclusion sets of every week up to the
//! deadlines they look at, so unwatched weeks are never counted as free.
//!
//! Do not hold the [`Ref`] returned by [`Session::state`] across a write:
//! the write's feed delivery needs to borrow the state mutably.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chrono::{Duration, NaiveDateTime};

use crate::availability::{availability_horizon, BlockKind, PersistedInterval, TaggedInterval};
use crate::clock::Clock;
use crate::error::Result;
use crate::pattern::{BasePattern, ExclusionSet};
use crate::priority::{priority_for_task, RankedTask, TaskOrder, TaskPriority};
use crate::state::{ScheduleState, WeekSummary};
use crate::store::{ExclusionStore, IntervalStore, PatternStore, Subscription, TaskStore};
use crate::task::Task;
use crate::week::{slot_key, slot_start, week_range, Slot, WeekId, WeekRange};

pub struct Session<S>
where
    S: IntervalStore + PatternStore + ExclusionStore + TaskStore,
{
    store: S,
    clock: Clock,
    state: Rc<RefCell<ScheduleState>>,
    feeds: Vec<Subscription>,
    exclusion_feed: Option<(WeekId, Subscription)>,
}

impl<S> Session<S>
where
    S: IntervalStore + PatternStore + ExclusionStore + TaskStore,
{
    /// Subscribe to the interval, pattern and task feeds and to the
    /// exclusions of the current week.
    pub fn connect(store: S, clock: Clock) -> Self {
        let state = Rc::new(RefCell::new(ScheduleState::new()));

        let sink = state.clone();
        let intervals = IntervalStore::subscribe(
            &store,
            Box::new(move |list: &[PersistedInterval]| sink.borrow_mut().apply_intervals(list)),
        );
        let sink = state.clone();
        let pattern = PatternStore::subscribe(
            &store,
            Box::new(move |pattern: &BasePattern| sink.borrow_mut().apply_pattern(pattern)),
        );
        let sink = state.clone();
        let tasks = TaskStore::subscribe(
            &store,
            Box::new(move |list: &[Task]| sink.borrow_mut().apply_tasks(list)),
        );

        let mut session = Self {
            store,
            clock,
            state,
            feeds: vec![intervals, pattern, tasks],
            exclusion_feed: None,
        };
        let current = WeekId::of(session.now());
        session.resubscribe(current);
        tracing::debug!(week = %current, "session connected");
        session
    }

    /// Watch `week`'s exclusions instead of the previously watched week.
    /// The returned handle can cancel the feed early; the session cancels it
    /// on the next resubscribe or when dropped.
    pub fn resubscribe(&mut self, week: WeekId) -> Subscription {
        if let Some((previous, feed)) = self.exclusion_feed.take() {
            feed.cancel();
            tracing::debug!(from = %previous, to = %week, "exclusion feed moved");
        }

        let sink = self.state.clone();
        let feed = ExclusionStore::subscribe(
            &self.store,
            week,
            Box::new(move |set: &ExclusionSet| sink.borrow_mut().apply_exclusions(week, set)),
        );
        self.exclusion_feed = Some((week, feed.clone()));
        feed
    }

    /// Resubscribe to the week `week_offset` weeks from now.
    pub fn watch_week(&mut self, week_offset: i64) -> Result<WeekRange> {
        let week = self.week(week_offset)?;
        self.resubscribe(week.week_id());
        Ok(week)
    }

    pub fn watched_week(&self) -> Option<WeekId> {
        self.exclusion_feed.as_ref().map(|(week, _)| *week)
    }

    /// One-shot fetch of exclusion sets for weeks that are not watched.
    pub fn refresh_exclusions<I>(&self, weeks: I) -> Result<()>
    where
        I: IntoIterator<Item = WeekId>,
    {
        for week in weeks {
            let set = ExclusionStore::get(&self.store, week)?;
            self.state.borrow_mut().apply_exclusions(week, &set);
        }
        Ok(())
    }

    pub fn state(&self) -> Ref<'_, ScheduleState> {
        self.state.borrow()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// The week `week_offset` weeks from now. Fails for offsets past the
    /// representable calendar.
    pub fn week(&self, week_offset: i64) -> Result<WeekRange> {
        Ok(week_range(self.now(), week_offset)?)
    }

    pub fn visible_week_blocks(&self, week_offset: i64) -> Result<Vec<TaggedInterval>> {
        let week = self.week(week_offset)?;
        Ok(self.state().visible_week_blocks(week))
    }

    pub fn week_summary(&self, week_offset: i64) -> Result<WeekSummary> {
        let week = self.week(week_offset)?;
        Ok(self.state().week_summary(week))
    }

    /// `Persisted { id }`, `Base` or `None` for one grid cell.
    pub fn classify_slot(&self, week_offset: i64, slot: Slot) -> Result<Option<BlockKind>> {
        let week = self.week(week_offset)?;
        Ok(self.state().classify_slot(week, slot))
    }

    /// Fetch the current exclusion set of every week between `now` and the
    /// latest of `deadlines`, up to the availability horizon.
    fn sync_exclusions_until<I>(&self, now: NaiveDateTime, deadlines: I) -> Result<()>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let Some(last) = deadlines.into_iter().max() else {
            return Ok(());
        };
        let end = availability_horizon(last, now);

        let mut weeks = Vec::new();
        let mut week = WeekRange::containing(now);
        while week.start < end {
            weeks.push(week.week_id());
            week = week.shifted(1)?;
        }
        tracing::trace!(weeks = weeks.len(), "syncing exclusions for availability");
        self.refresh_exclusions(weeks)
    }

    pub fn priority_for_task(&self, task: &Task) -> Result<TaskPriority> {
        let now = self.now();
        self.sync_exclusions_until(now, task.deadline())?;
        let state = self.state();
        Ok(priority_for_task(task, now, &state.source()))
    }

    pub fn rank_tasks(&self, order: TaskOrder, include_completed: bool) -> Result<Vec<RankedTask>> {
        let now = self.now();
        let deadlines: Vec<NaiveDateTime> = self
            .state()
            .tasks
            .iter()
            .filter(|t| include_completed || !t.completed)
            .filter_map(Task::deadline)
            .collect();
        self.sync_exclusions_until(now, deadlines)?;
        Ok(self.state().rank_tasks(now, order, include_completed))
    }

    /// Flip one pattern slot and save the whole pattern. Returns whether the
    /// slot is patterned afterwards.
    pub fn toggle_pattern_slot(&self, slot: Slot) -> Result<bool> {
        let mut pattern = self.state().pattern.clone();
        let patterned = pattern.toggle(slot);
        PatternStore::save(&self.store, &pattern)?;
        Ok(patterned)
    }

    pub fn clear_pattern(&self) -> Result<()> {
        PatternStore::save(&self.store, &BasePattern::new())?;
        Ok(())
    }

    /// Suppress (or restore) a pattern slot for one week only.
    pub fn set_slot_excluded(&self, week_offset: i64, slot: Slot, exclude: bool) -> Result<()> {
        let week = self.week(week_offset)?;
        ExclusionStore::toggle(&self.store, week.week_id(), slot_key(week.start, slot), exclude)?;
        Ok(())
    }

    pub fn add_interval(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<String> {
        Ok(IntervalStore::add(&self.store, start, end)?)
    }

    /// Turn a grid cell into a fixed one-hour persisted block. A pattern
    /// slot at the same time is then suppressed by precedence.
    pub fn pin_slot(&self, week_offset: i64, slot: Slot) -> Result<String> {
        let start = slot_start(self.week(week_offset)?.start, slot);
        self.add_interval(start, start + Duration::hours(1))
    }

    pub fn delete_interval(&self, id: &str) -> Result<()> {
        IntervalStore::delete(&self.store, id)?;
        Ok(())
    }

    pub fn add_task(&self, task: Task) -> Result<()> {
        TaskStore::add(&self.store, task)?;
        Ok(())
    }

    pub fn set_task_completed(&self, id: &str, completed: bool) -> Result<()> {
        TaskStore::set_completed(&self.store, id, completed)?;
        Ok(())
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        TaskStore::delete(&self.store, id)?;
        Ok(())
    }
}

impl<S> Drop for Session<S>
where
    S: IntervalStore + PatternStore + ExclusionStore + TaskStore,
{
    fn drop(&mut self) {
        for feed in self.feeds.drain(..) {
            feed.cancel();
        }
        if let Some((_, feed)) = self.exclusion_feed.take() {
            feed.cancel();
        }
    }
}
