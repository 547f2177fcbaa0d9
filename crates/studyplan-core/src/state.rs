//! Materialized snapshot of everything the stores have delivered.
//!
//! Each `apply_*` replaces its part wholesale. Updates are applied in
//! arrival order and nothing is merged, so the latest delivery for a key
//! always wins. Derived views (week blocks, rankings) are recomputed in
//! full on every query.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::availability::{
    visible_week_blocks, AvailabilitySource, BlockKind, PersistedInterval, TaggedInterval,
};
use crate::interval::covered_minutes;
use crate::pattern::{BasePattern, ExclusionCache, ExclusionSet};
use crate::priority::{rank_tasks, RankedTask, TaskOrder};
use crate::task::Task;
use crate::week::{Slot, WeekId, WeekRange};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default)]
    pub intervals: Vec<PersistedInterval>,
    #[serde(default)]
    pub pattern: BasePattern,
    #[serde(default)]
    pub exclusions: ExclusionCache,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One week of the grid, ready to paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week_id: WeekId,
    pub range: WeekRange,
    pub blocks: Vec<TaggedInterval>,
    /// Union of the visible blocks, in minutes.
    pub available_minutes: f64,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_intervals(&mut self, intervals: &[PersistedInterval]) {
        self.intervals = intervals.to_vec();
    }

    pub fn apply_pattern(&mut self, pattern: &BasePattern) {
        self.pattern = pattern.clone();
    }

    /// Replace, never union, the cached exclusions of `week`.
    pub fn apply_exclusions(&mut self, week: WeekId, set: &ExclusionSet) {
        let previous = self.exclusions.replace(week, set.clone());
        tracing::debug!(
            week = %week,
            previous = previous.map(|s| s.len()).unwrap_or(0),
            current = set.len(),
            "exclusions replaced"
        );
    }

    pub fn apply_tasks(&mut self, tasks: &[Task]) {
        self.tasks = tasks.to_vec();
    }

    pub fn source(&self) -> AvailabilitySource<'_> {
        AvailabilitySource::new(&self.intervals, &self.pattern, &self.exclusions)
    }

    pub fn visible_week_blocks(&self, week: WeekRange) -> Vec<TaggedInterval> {
        visible_week_blocks(
            &self.intervals,
            &self.pattern,
            self.exclusions.for_week(&week.week_id()),
            week,
        )
    }

    pub fn week_summary(&self, week: WeekRange) -> WeekSummary {
        let blocks = self.visible_week_blocks(week);
        // persisted blocks may spill past the week; count only what lies inside
        let available_minutes = covered_minutes(
            blocks
                .iter()
                .filter_map(|b| b.interval().clip(week.start, week.end)),
        );
        WeekSummary {
            week_id: week.week_id(),
            range: week,
            blocks,
            available_minutes,
        }
    }

    pub fn classify_slot(&self, week: WeekRange, slot: Slot) -> Option<BlockKind> {
        self.source().classify_slot(week, slot)
    }

    pub fn rank_tasks(
        &self,
        now: NaiveDateTime,
        order: TaskOrder,
        include_completed: bool,
    ) -> Vec<RankedTask> {
        rank_tasks(&self.tasks, now, &self.source(), order, include_completed)
    }
}
