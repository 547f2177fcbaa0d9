//! Task priority calculation.
//!
//! Each task goes through three derived values:
//! - slack margin: effort needed over free time left before the deadline
//! - urgency level: a 1-5 bucket of the slack margin
//! - score: `urgency * 1.2 + importance`
//!
//! Urgency dominates; importance shifts tasks within an urgency band.
//! Nothing here fails. A task without a usable deadline has no free time
//! and lands at maximum urgency.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilitySource;
use crate::error::ValidationError;
use crate::task::Task;

/// Floor on the available-hours denominator of the slack margin.
pub const MIN_AVAILABLE_HOURS: f64 = 0.001;

/// Weight of the urgency level in the score.
pub const URGENCY_WEIGHT: f64 = 1.2;

/// Upper bounds (exclusive) of urgency levels 1-4. Anything at or above the
/// last bound is level 5.
pub const URGENCY_THRESHOLDS: [f64; 4] = [0.15, 0.30, 0.45, 0.60];

/// `time_needed / max(time_available, 0.001)`, both in hours.
pub fn slack_margin(time_needed: f64, time_available: f64) -> f64 {
    time_needed / time_available.max(MIN_AVAILABLE_HOURS)
}

/// Bucket a slack margin into 1-5. Each bound is compared with a strict
/// `<`, so a margin of exactly 0.15 is level 2.
pub fn urgency_level(margin: f64) -> u8 {
    URGENCY_THRESHOLDS
        .iter()
        .position(|bound| margin < *bound)
        .map(|i| i as u8 + 1)
        .unwrap_or(5)
}

/// `urgency * 1.2 + importance`. Not clamped.
pub fn priority_score(urgency: u8, importance: u8) -> f64 {
    f64::from(urgency) * URGENCY_WEIGHT + f64::from(importance)
}

/// Everything the engine derives for one task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPriority {
    pub time_available_hours: f64,
    pub slack_margin: f64,
    pub urgency_level: u8,
    pub score: f64,
}

/// Derive the priority of `task` as of `now`.
pub fn priority_for_task(
    task: &Task,
    now: NaiveDateTime,
    source: &AvailabilitySource<'_>,
) -> TaskPriority {
    let deadline = task.deadline();
    if deadline.is_none() {
        tracing::warn!(task = %task.id, due_date = %task.due_date, "unparseable due date, treating as no time left");
    }

    let time_available_hours = source.minutes_until(deadline, now) / 60.0;
    let margin = slack_margin(task.time_needed, time_available_hours);
    let urgency = urgency_level(margin);

    TaskPriority {
        time_available_hours,
        slack_margin: margin,
        urgency_level: urgency,
        score: priority_score(urgency, task.importance),
    }
}

/// Display orderings for a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrder {
    /// Score, highest first
    #[default]
    Priority,
    /// Due date, earliest first; unparseable dates last
    DueDate,
    /// Name, lexical
    Name,
    /// Effort, smallest first
    Effort,
}

impl TaskOrder {
    pub const ALL: [TaskOrder; 4] = [
        TaskOrder::Priority,
        TaskOrder::DueDate,
        TaskOrder::Name,
        TaskOrder::Effort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOrder::Priority => "priority",
            TaskOrder::DueDate => "due_date",
            TaskOrder::Name => "name",
            TaskOrder::Effort => "effort",
        }
    }

    pub fn compare(&self, a: &RankedTask, b: &RankedTask) -> Ordering {
        let by_due = || match (a.task.due(), b.task.due()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let by_name = || a.task.name.cmp(&b.task.name);

        match self {
            TaskOrder::Priority => b
                .priority
                .score
                .total_cmp(&a.priority.score)
                .then_with(by_due)
                .then_with(by_name),
            TaskOrder::DueDate => by_due().then_with(by_name),
            TaskOrder::Name => by_name(),
            TaskOrder::Effort => a
                .task
                .time_needed
                .total_cmp(&b.task.time_needed)
                .then_with(by_name),
        }
    }
}

impl fmt::Display for TaskOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "priority" | "score" => Ok(TaskOrder::Priority),
            "due_date" | "due" => Ok(TaskOrder::DueDate),
            "name" => Ok(TaskOrder::Name),
            "effort" | "time_needed" => Ok(TaskOrder::Effort),
            other => Err(ValidationError::InvalidValue {
                field: "order".into(),
                message: format!("unknown task order '{other}'"),
            }),
        }
    }
}

/// A task with its derived priority fields, for rendering or custom sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTask {
    pub task: Task,
    pub priority: TaskPriority,
}

/// Compute priorities for `tasks` and sort them by `order`.
pub fn rank_tasks(
    tasks: &[Task],
    now: NaiveDateTime,
    source: &AvailabilitySource<'_>,
    order: TaskOrder,
    include_completed: bool,
) -> Vec<RankedTask> {
    let mut ranked: Vec<RankedTask> = tasks
        .iter()
        .filter(|t| include_completed || !t.completed)
        .map(|task| RankedTask {
            task: task.clone(),
            priority: priority_for_task(task, now, source),
        })
        .collect();
    ranked.sort_by(|a, b| order.compare(a, b));
    ranked
}
