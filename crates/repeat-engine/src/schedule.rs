//! Task-level helpers built on the evaluator.
//!
//! These are the computations a task service performs around its storage
//! calls: normalizing a task before it is saved, deciding what "done" means for
//! a recurring task, and turning the search box into a filter. They take
//! `today` from the caller and never touch storage themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::CalendarDate;
use crate::error::ScheduleError;
use crate::evaluator::Evaluator;

/// Rows a task listing returns at most.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Date format accepted by the search box (`DD.MM.YYYY`).
pub const SEARCH_DATE_FORMAT: &str = "%d.%m.%Y";

/// A stored task. Dates and rules are kept as the raw strings the storage
/// layer holds; they are only interpreted by the functions below.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repeat: String,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        !self.repeat.is_empty()
    }
}

/// What happens to a task once it is marked done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// One-off task: delete it.
    Remove,
    /// Recurring task: keep it with this new date.
    Reschedule(CalendarDate),
}

/// Normalize a task before it is created or updated.
///
/// - the title must not be blank
/// - an empty date becomes `today`
/// - a date in the past is moved up to `today`
/// - a non-empty repeat rule must evaluate against `today`
///
/// # Errors
///
/// [`ScheduleError::MissingTitle`], [`ScheduleError::InvalidDate`] for a date
/// that is not `YYYYMMDD`, or [`ScheduleError::Rule`] for a rejected rule.
pub fn prepare_task(
    evaluator: &Evaluator,
    mut task: Task,
    today: CalendarDate,
) -> Result<Task, ScheduleError> {
    if task.title.trim().is_empty() {
        return Err(ScheduleError::MissingTitle);
    }

    if task.date.is_empty() {
        task.date = today.to_string();
    } else {
        let date = CalendarDate::parse(&task.date)
            .map_err(|_| ScheduleError::InvalidDate(task.date.clone()))?;
        if date < today {
            task.date = today.to_string();
        }
    }

    if task.is_recurring() {
        evaluator.next_date(&task.date, today, &task.repeat)?;
    }

    Ok(task)
}

/// Decide what marking `task` as done does.
///
/// # Errors
///
/// [`ScheduleError::Rule`] if the stored date or rule no longer evaluates.
pub fn complete_task(
    evaluator: &Evaluator,
    task: &Task,
    today: CalendarDate,
) -> Result<Completion, ScheduleError> {
    if !task.is_recurring() {
        return Ok(Completion::Remove);
    }
    let next = evaluator.next_date(&task.date, today, &task.repeat)?;
    Ok(Completion::Reschedule(next))
}

/// A task-list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    All,
    /// Tasks due on exactly this date.
    Date(CalendarDate),
    /// Tasks whose title or comment contains `query`; `pattern` is the SQL
    /// `LIKE` form.
    Text { query: String, pattern: String },
}

impl SearchFilter {
    /// Interpret the search box: a `DD.MM.YYYY` date searches by date,
    /// anything else searches text.
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() {
            return Self::All;
        }
        match NaiveDate::parse_from_str(query, SEARCH_DATE_FORMAT) {
            Ok(date) => Self::Date(date.into()),
            Err(_) => Self::Text {
                query: query.to_string(),
                pattern: format!("%{query}%"),
            },
        }
    }
}
