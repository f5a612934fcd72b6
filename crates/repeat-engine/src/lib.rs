//! # repeat-engine
//!
//! Deterministic next-occurrence computation for recurring tasks.
//!
//! A task carries an anchor date (`YYYYMMDD`) and a compact repeat rule
//! (`d 7`, `y`, `w 1,3`, `m 1,-1 1,6`). Given a reference "now", the engine
//! computes the date on which the task is next due, or explains why the rule
//! is rejected. All computation is pure: no clock, no I/O, no shared state.
//!
//! ## Modules
//!
//! - [`date`] — `YYYYMMDD` calendar dates and month arithmetic
//! - [`rule`] — Repeat rule grammar, parsing and validation
//! - [`resolver`] — Signed day-of-month selectors → concrete days of a month
//! - [`evaluator`] — Next due date per rule family
//! - [`schedule`] — Task normalization, completion and search filters
//! - [`error`] — Error types

pub mod date;
pub mod error;
pub mod evaluator;
pub mod resolver;
pub mod rule;
pub mod schedule;

pub use date::{days_in_month, CalendarDate, DATE_FORMAT};
pub use error::{RuleError, ScheduleError};
pub use evaluator::{next_date, Evaluator, EvaluatorConfig, DEFAULT_MONTH_SEARCH_LIMIT};
pub use resolver::resolve_month_days;
pub use rule::{RecurrenceRule, MAX_INTERVAL_DAYS};
pub use schedule::{
    complete_task, prepare_task, Completion, SearchFilter, Task, DEFAULT_LIST_LIMIT,
};
