//! In-process implementation of every store contract.
//!
//! Backs the CLI (seeded from a snapshot file) and the tests. Subscribers
//! get the current value as soon as they subscribe and again after every
//! write that touches their feed.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::{Rc, Weak};

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::{
    ExclusionCallback, ExclusionStore, IntervalCallback, IntervalStore, PatternCallback,
    PatternStore, Subscription, TaskCallback, TaskStore,
};
use crate::availability::PersistedInterval;
use crate::error::{StoreError, ValidationError};
use crate::pattern::{BasePattern, ExclusionSet};
use crate::state::ScheduleState;
use crate::task::Task;
use crate::week::{SlotKey, WeekId};

#[derive(Default)]
struct Inner {
    data: ScheduleState,
    next_id: u64,
    intervals: BTreeMap<u64, IntervalCallback>,
    patterns: BTreeMap<u64, PatternCallback>,
    exclusions: BTreeMap<u64, (WeekId, ExclusionCallback)>,
    tasks: BTreeMap<u64, TaskCallback>,
    /// Cancelled while their feed was being notified.
    cancelled_in_flight: HashSet<u64>,
}

impl Inner {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn forget(&mut self, id: u64) {
        let removed = self.intervals.remove(&id).is_some()
            || self.patterns.remove(&id).is_some()
            || self.exclusions.remove(&id).is_some()
            || self.tasks.remove(&id).is_some();
        if !removed {
            self.cancelled_in_flight.insert(id);
        }
    }
}

fn interval_feed(inner: &mut Inner) -> &mut BTreeMap<u64, IntervalCallback> {
    &mut inner.intervals
}

fn pattern_feed(inner: &mut Inner) -> &mut BTreeMap<u64, PatternCallback> {
    &mut inner.patterns
}

fn exclusion_feed(inner: &mut Inner) -> &mut BTreeMap<u64, (WeekId, ExclusionCallback)> {
    &mut inner.exclusions
}

fn task_feed(inner: &mut Inner) -> &mut BTreeMap<u64, TaskCallback> {
    &mut inner.tasks
}

/// Shared handle; clones see the same data and subscribers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `state`.
    pub fn seeded(state: ScheduleState) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().data = state;
        store
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> ScheduleState {
        self.inner.borrow().data.clone()
    }

    /// Number of live subscriptions across all feeds.
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.intervals.len() + inner.patterns.len() + inner.exclusions.len() + inner.tasks.len()
    }

    fn register(&self) -> (u64, Weak<RefCell<Inner>>) {
        let id = self.inner.borrow_mut().allocate_id();
        (id, Rc::downgrade(&self.inner))
    }

    fn subscription(id: u64, weak: Weak<RefCell<Inner>>) -> Subscription {
        Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().forget(id);
            }
        })
    }

    /// Call every listener of one feed without holding the borrow, then put
    /// the listeners back along with any registered meanwhile.
    fn notify<C>(&self, feed: fn(&mut Inner) -> &mut BTreeMap<u64, C>, mut call: impl FnMut(&mut C)) {
        let mut listeners = std::mem::take(feed(&mut *self.inner.borrow_mut()));

        for (id, listener) in listeners.iter_mut() {
            if self.inner.borrow().cancelled_in_flight.contains(id) {
                continue;
            }
            call(listener);
        }

        let mut inner = self.inner.borrow_mut();
        let cancelled = std::mem::take(&mut inner.cancelled_in_flight);
        listeners.retain(|id, _| !cancelled.contains(id));
        let slot = feed(&mut *inner);
        listeners.append(slot);
        *slot = listeners;
    }

    fn publish_intervals(&self) {
        let current = self.inner.borrow().data.intervals.clone();
        self.notify(interval_feed, |cb| cb(current.as_slice()));
    }

    fn publish_pattern(&self) {
        let current = self.inner.borrow().data.pattern.clone();
        self.notify(pattern_feed, |cb| cb(&current));
    }

    fn publish_week(&self, week: WeekId) {
        let current = self.inner.borrow().data.exclusions.for_week(&week).clone();
        self.notify(exclusion_feed, |entry: &mut (WeekId, ExclusionCallback)| {
            let (watched, cb) = entry;
            if *watched == week {
                cb(&current);
            }
        });
    }

    fn publish_tasks(&self) {
        let current = self.inner.borrow().data.tasks.clone();
        self.notify(task_feed, |cb| cb(current.as_slice()));
    }
}

impl IntervalStore for MemoryStore {
    fn list(&self) -> Result<Vec<PersistedInterval>, StoreError> {
        Ok(self.inner.borrow().data.intervals.clone())
    }

    fn subscribe(&self, mut callback: IntervalCallback) -> Subscription {
        let (id, weak) = self.register();
        let current = self.inner.borrow().data.intervals.clone();
        callback(current.as_slice());
        self.inner.borrow_mut().intervals.insert(id, callback);
        Self::subscription(id, weak)
    }

    fn add(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<String, StoreError> {
        if end <= start {
            let err = ValidationError::InvalidTimeRange { start, end };
            return Err(StoreError::Rejected(err.to_string()));
        }
        let id = Uuid::new_v4().to_string();
        self.inner
            .borrow_mut()
            .data
            .intervals
            .push(PersistedInterval::new(id.clone(), start, end));
        self.publish_intervals();
        Ok(id)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.borrow_mut();
            let before = inner.data.intervals.len();
            inner.data.intervals.retain(|p| p.id != id);
            if inner.data.intervals.len() == before {
                return Err(StoreError::NotFound {
                    kind: "interval",
                    id: id.to_string(),
                });
            }
        }
        self.publish_intervals();
        Ok(())
    }
}

impl PatternStore for MemoryStore {
    fn get(&self) -> Result<BasePattern, StoreError> {
        Ok(self.inner.borrow().data.pattern.clone())
    }

    fn subscribe(&self, mut callback: PatternCallback) -> Subscription {
        let (id, weak) = self.register();
        let current = self.inner.borrow().data.pattern.clone();
        callback(&current);
        self.inner.borrow_mut().patterns.insert(id, callback);
        Self::subscription(id, weak)
    }

    fn save(&self, pattern: &BasePattern) -> Result<(), StoreError> {
        self.inner.borrow_mut().data.pattern = pattern.clone();
        self.publish_pattern();
        Ok(())
    }
}

impl ExclusionStore for MemoryStore {
    fn get(&self, week: WeekId) -> Result<ExclusionSet, StoreError> {
        Ok(self.inner.borrow().data.exclusions.for_week(&week).clone())
    }

    fn subscribe(&self, week: WeekId, mut callback: ExclusionCallback) -> Subscription {
        let (id, weak) = self.register();
        let current = self.inner.borrow().data.exclusions.for_week(&week).clone();
        callback(&current);
        self.inner.borrow_mut().exclusions.insert(id, (week, callback));
        Self::subscription(id, weak)
    }

    fn toggle(&self, week: WeekId, key: SlotKey, exclude: bool) -> Result<(), StoreError> {
        self.inner
            .borrow_mut()
            .data
            .exclusions
            .entry_mut(week)
            .set_excluded(key, exclude);
        self.publish_week(week);
        Ok(())
    }
}

impl TaskStore for MemoryStore {
    fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.inner.borrow().data.tasks.clone())
    }

    fn subscribe(&self, mut callback: TaskCallback) -> Subscription {
        let (id, weak) = self.register();
        let current = self.inner.borrow().data.tasks.clone();
        callback(current.as_slice());
        self.inner.borrow_mut().tasks.insert(id, callback);
        Self::subscription(id, weak)
    }

    fn add(&self, task: Task) -> Result<(), StoreError> {
        task.validate()
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        {
            let mut inner = self.inner.borrow_mut();
            if inner.data.tasks.iter().any(|t| t.id == task.id) {
                return Err(StoreError::Rejected(format!("task '{}' already exists", task.id)));
            }
            inner.data.tasks.push(task);
        }
        self.publish_tasks();
        Ok(())
    }

    fn set_completed(&self, id: &str, completed: bool) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.borrow_mut();
            let task = inner
                .data
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    kind: "task",
                    id: id.to_string(),
                })?;
            task.completed = completed;
        }
        self.publish_tasks();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.borrow_mut();
            let before = inner.data.tasks.len();
            inner.data.tasks.retain(|t| t.id != id);
            if inner.data.tasks.len() == before {
                return Err(StoreError::NotFound {
                    kind: "task",
                    id: id.to_string(),
                });
            }
        }
        self.publish_tasks();
        Ok(())
    }
}
