//! # Studyplan Core Library
//!
//! This library provides the scheduling logic behind the studyplan planner:
//! when a student can study, and which task deserves the next hour.
//! All operations are available through the standalone `studyplan` CLI,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Time primitives**: local wall-clock weeks, hour slots and slot keys
//! - **Availability**: a recurring weekly pattern minus per-week exclusions,
//!   overlaid with explicitly pinned blocks
//! - **Priority**: slack-margin urgency and a ranked task list
//! - **Stores**: change-feed contracts plus an in-memory implementation;
//!   a [`Session`] keeps a [`ScheduleState`] in sync with them
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`availability_until`]: Minutes of study time before a deadline
//! - [`priority_for_task`]: Urgency and score for one task
//! - [`Session`]: Store subscriptions and write-through actions
//! - [`Config`]: Application configuration management

pub mod availability;
pub mod clock;
pub mod error;
pub mod interval;
pub mod pattern;
pub mod priority;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod task;
pub mod week;

pub use availability::{
    availability_until, classify_slot, visible_week_blocks, AvailabilitySource, BlockKind,
    PersistedInterval, TaggedInterval,
};
pub use clock::Clock;
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use interval::{covered_minutes, merge_intervals, Interval};
pub use pattern::{BasePattern, ExclusionCache, ExclusionSet};
pub use priority::{priority_for_task, rank_tasks, RankedTask, TaskOrder, TaskPriority};
pub use session::Session;
pub use state::{ScheduleState, WeekSummary};
pub use storage::Config;
pub use store::{ExclusionStore, IntervalStore, MemoryStore, PatternStore, Subscription, TaskStore};
pub use task::Task;
pub use week::{week_range, Slot, SlotKey, WeekId, WeekRange};
