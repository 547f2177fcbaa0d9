//! Wall-clock source with an injectable offset.
//!
//! Every instant in the engine is a local wall-clock `NaiveDateTime`; no
//! timezone conversion happens past reading the system's local time.

use chrono::{Duration, Local, NaiveDateTime};

/// Source of "now". Production code uses a zero offset; tests and the CLI's
/// `--now` flag shift it to a fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    offset: Duration,
}

impl Clock {
    /// Real local time, no offset.
    pub fn system() -> Self {
        Self {
            offset: Duration::zero(),
        }
    }

    /// Real local time shifted by `offset`.
    pub fn with_offset(offset: Duration) -> Self {
        Self { offset }
    }

    /// A clock whose `now()` currently reads `instant`. It keeps ticking
    /// from there in real time.
    pub fn pinned_at(instant: NaiveDateTime) -> Self {
        Self::with_offset(instant - Local::now().naive_local())
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Duration) {
        self.offset = offset;
    }

    pub fn now(&self) -> NaiveDateTime {
        Local::now().naive_local() + self.offset
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
