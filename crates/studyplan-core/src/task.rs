//! Study tasks: a due date, an effort estimate and an importance.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Importance assigned when the store record carries none.
pub const DEFAULT_IMPORTANCE: u8 = 3;

fn default_importance() -> u8 {
    DEFAULT_IMPORTANCE
}

/// A task as delivered by the task store.
///
/// `due_date` is kept as the raw `YYYY-MM-DD` string. A value that does not
/// parse is not rejected here; it simply has no deadline and the priority
/// engine treats it as having no time left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub due_date: String,
    /// Estimated effort in hours.
    pub time_needed: f64,
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        due_date: NaiveDate,
        time_needed: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            due_date: due_date.format("%Y-%m-%d").to_string(),
            time_needed,
            importance: DEFAULT_IMPORTANCE,
            completed: false,
        }
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn due(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d").ok()
    }

    /// 23:59:59 local time on the due date.
    pub fn deadline(&self) -> Option<NaiveDateTime> {
        self.due().map(end_of_day)
    }

    /// Reject records no user action should be able to create.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "must not be empty".into(),
            });
        }
        if !self.time_needed.is_finite() || self.time_needed <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "timeNeeded".into(),
                message: format!("{} is not a positive number of hours", self.time_needed),
            });
        }
        if !(1..=5).contains(&self.importance) {
            return Err(ValidationError::InvalidValue {
                field: "importance".into(),
                message: format!("{} is outside 1-5", self.importance),
            });
        }
        Ok(())
    }
}

/// Deadline instant for a due date.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deadline_is_end_of_due_day() {
        let task = Task::new("t1", "Essay", date(2026, 3, 20), 2.0);
        assert_eq!(
            task.deadline(),
            Some(date(2026, 3, 20).and_hms_opt(23, 59, 59).unwrap())
        );
    }

    #[test]
    fn unparseable_due_date_has_no_deadline() {
        let mut task = Task::new("t1", "Essay", date(2026, 3, 20), 2.0);
        task.due_date = "someday".into();
        assert_eq!(task.deadline(), None);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn importance_defaults_when_missing() {
        let task: Task = serde_json::from_str(
            r#"{"id":"a","name":"Read ch. 4","dueDate":"2026-03-18","timeNeeded":1.5}"#,
        )
        .unwrap();
        assert_eq!(task.importance, DEFAULT_IMPORTANCE);
        assert!(!task.completed);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let ok = Task::new("t1", "Essay", date(2026, 3, 20), 2.0);
        assert!(ok.validate().is_ok());

        assert!(ok.clone().with_importance(0).validate().is_err());
        assert!(ok.clone().with_importance(6).validate().is_err());

        let mut zero = ok.clone();
        zero.time_needed = 0.0;
        assert!(zero.validate().is_err());

        let mut nan = ok.clone();
        nan.time_needed = f64::NAN;
        assert!(nan.validate().is_err());

        let mut unnamed = ok;
        unnamed.name = "  ".into();
        assert!(unnamed.validate().is_err());
    }
}
