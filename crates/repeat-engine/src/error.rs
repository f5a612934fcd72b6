//! Error types for repeat-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid date format: '{0}' (expected YYYYMMDD)")]
    InvalidAnchorFormat(String),

    #[error("Repeat rule is empty")]
    EmptyRule,

    #[error("Unknown repeat type: '{0}'")]
    UnknownRuleType(String),

    #[error("Invalid repeat format: {0}")]
    InvalidFormat(String),

    #[error("Invalid day interval: '{0}'")]
    InvalidInterval(String),

    #[error("Invalid day of the week: '{0}'")]
    InvalidWeekday(String),

    #[error("Invalid day of the month: '{0}'")]
    InvalidDayOfMonth(String),

    #[error("Invalid month: '{0}'")]
    InvalidMonth(String),

    #[error("No matching date within {limit} months")]
    SearchExhausted { limit: u32 },

    #[error("Date arithmetic out of range")]
    DateOutOfRange,
}

/// Failures of the task-level helpers in [`crate::schedule`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Task title not specified")]
    MissingTitle,

    #[error("Date is in the wrong format: '{0}'")]
    InvalidDate(String),

    #[error("Invalid format of repeat rule: {0}")]
    Rule(#[from] RuleError),
}

pub type Result<T> = std::result::Result<T, RuleError>;
