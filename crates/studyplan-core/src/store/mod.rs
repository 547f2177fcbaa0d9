//! Contracts for the external document stores.
//!
//! Every feed delivers the full current value on each change, never a
//! delta. Subscribers replace what they hold with what they receive.
//! Callbacks run synchronously on the thread that performed the write and
//! must not call back into the store that is notifying them.

mod memory;

pub use memory::MemoryStore;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::availability::PersistedInterval;
use crate::error::StoreError;
use crate::pattern::{BasePattern, ExclusionSet};
use crate::task::Task;
use crate::week::{SlotKey, WeekId};

pub type IntervalCallback = Box<dyn FnMut(&[PersistedInterval])>;
pub type PatternCallback = Box<dyn FnMut(&BasePattern)>;
pub type ExclusionCallback = Box<dyn FnMut(&ExclusionSet)>;
pub type TaskCallback = Box<dyn FnMut(&[Task])>;

/// Explicitly created/deleted study blocks.
pub trait IntervalStore {
    fn list(&self) -> Result<Vec<PersistedInterval>, StoreError>;

    fn subscribe(&self, callback: IntervalCallback) -> Subscription;

    /// Create a block and return its id.
    fn add(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<String, StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// The global weekly pattern.
pub trait PatternStore {
    fn get(&self) -> Result<BasePattern, StoreError>;

    fn subscribe(&self, callback: PatternCallback) -> Subscription;

    /// Replace the stored pattern wholesale.
    fn save(&self, pattern: &BasePattern) -> Result<(), StoreError>;
}

/// Per-week exclusion sets.
pub trait ExclusionStore {
    /// Current set for one week; empty if the week has none.
    fn get(&self, week: WeekId) -> Result<ExclusionSet, StoreError>;

    /// Watch one week. The callback receives that week's complete set.
    fn subscribe(&self, week: WeekId, callback: ExclusionCallback) -> Subscription;

    /// Set or clear one slot's exclusion. Idempotent.
    fn toggle(&self, week: WeekId, key: SlotKey, exclude: bool) -> Result<(), StoreError>;
}

/// Study tasks.
pub trait TaskStore {
    fn list(&self) -> Result<Vec<Task>, StoreError>;

    fn subscribe(&self, callback: TaskCallback) -> Subscription;

    fn add(&self, task: Task) -> Result<(), StoreError>;

    fn set_completed(&self, id: &str, completed: bool) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

struct SubscriptionInner {
    id: u64,
    cancelled: Cell<bool>,
    on_cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Cancellation handle for a feed.
///
/// Clones share the same feed; cancelling any of them stops delivery for
/// all. Dropping a handle does not cancel it.
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    pub fn new(id: u64, on_cancel: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                id,
                cancelled: Cell::new(false),
                on_cancel: RefCell::new(Some(Box::new(on_cancel))),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        !self.inner.cancelled.get()
    }

    /// Stop delivery. Later calls do nothing.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        let hook = self.inner.on_cancel.borrow_mut().take();
        if let Some(on_cancel) = hook {
            on_cancel();
        }
        tracing::trace!(subscription = self.inner.id, "subscription cancelled");
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}
