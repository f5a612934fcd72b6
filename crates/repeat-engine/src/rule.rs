//! Recurrence rule grammar.
//!
//! A rule is a single line of whitespace-separated tokens. The first token
//! names the rule family, the rest are comma-separated integer lists:
//!
//! | Rule              | Meaning                                              |
//! |-------------------|------------------------------------------------------|
//! | `d 7`             | every 7 days (1-400)                                 |
//! | `y`               | every year on the anchor's month and day             |
//! | `w 1,3`           | every Monday and Wednesday (1 = Mon .. 7 = Sun)      |
//! | `m 1,-1`          | the 1st and the last day of every month              |
//! | `m 15 3,9`        | the 15th of March and September                      |
//!
//! Parsing stops at the first invalid token; there are no partial rules.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{Result, RuleError};

/// Upper bound of a daily interval.
pub const MAX_INTERVAL_DAYS: u16 = 400;

const WEEKDAY_RANGE: RangeInclusive<i64> = 1..=7;
const DAY_OF_MONTH_RANGE: RangeInclusive<i64> = -31..=31;
const MONTH_RANGE: RangeInclusive<i64> = 1..=12;

/// A parsed recurrence rule.
///
/// Rules are rebuilt from their text on every evaluation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// `d N`: every `interval_days` days, 1-400.
    Daily { interval_days: u16 },
    /// `y`: every year.
    Yearly,
    /// `w 1,2,..`: on the given ISO weekdays.
    Weekly { weekdays: BTreeSet<u8> },
    /// `m d1,d2,.. [m1,m2,..]`: on the given days of month, optionally only
    /// in the given months. Negative days count back from month end.
    Monthly {
        day_selectors: Vec<i8>,
        months: Option<BTreeSet<u8>>,
    },
}

impl RecurrenceRule {
    /// Parse a rule string.
    ///
    /// # Errors
    ///
    /// - [`RuleError::EmptyRule`] for an empty or whitespace-only string
    /// - [`RuleError::UnknownRuleType`] if the first token is not `d`, `y`, `w` or `m`
    /// - [`RuleError::InvalidFormat`] for a wrong number of parameter tokens
    /// - [`RuleError::InvalidInterval`], [`RuleError::InvalidWeekday`],
    ///   [`RuleError::InvalidDayOfMonth`], [`RuleError::InvalidMonth`] for a bad number
    ///
    /// # Examples
    ///
    /// ```
    /// use repeat_engine::RecurrenceRule;
    ///
    /// let rule = RecurrenceRule::parse("m 1,-1 1,7").unwrap();
    /// assert_eq!(rule.to_string(), "m 1,-1 1,7");
    /// assert!(RecurrenceRule::parse("d 401").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let family = tokens.next().ok_or(RuleError::EmptyRule)?;
        let params: Vec<&str> = tokens.collect();

        match family {
            "d" => parse_daily(&params),
            "y" => parse_yearly(&params),
            "w" => parse_weekly(&params),
            "m" => parse_monthly(&params),
            other => Err(RuleError::UnknownRuleType(other.to_string())),
        }
    }

    /// Check the invariants [`parse`](Self::parse) enforces on a rule that was
    /// built directly rather than parsed.
    ///
    /// # Errors
    ///
    /// The same variants `parse` reports for the offending value, or
    /// [`RuleError::InvalidFormat`] for an empty weekday, day or month set.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Daily { interval_days } => {
                if (1..=MAX_INTERVAL_DAYS).contains(interval_days) {
                    Ok(())
                } else {
                    Err(RuleError::InvalidInterval(interval_days.to_string()))
                }
            }
            Self::Yearly => Ok(()),
            Self::Weekly { weekdays } => {
                if weekdays.is_empty() {
                    return Err(RuleError::InvalidFormat(
                        "'w' needs at least one weekday".to_string(),
                    ));
                }
                check_all(
                    weekdays.iter().map(|&w| i64::from(w)),
                    |n| WEEKDAY_RANGE.contains(&n),
                    RuleError::InvalidWeekday,
                )
            }
            Self::Monthly {
                day_selectors,
                months,
            } => {
                if day_selectors.is_empty() {
                    return Err(RuleError::InvalidFormat(
                        "'m' needs at least one day of the month".to_string(),
                    ));
                }
                check_all(
                    day_selectors.iter().map(|&d| i64::from(d)),
                    |n| n != 0 && DAY_OF_MONTH_RANGE.contains(&n),
                    RuleError::InvalidDayOfMonth,
                )?;
                match months {
                    Some(months) if months.is_empty() => Err(RuleError::InvalidFormat(
                        "'m' month list is empty".to_string(),
                    )),
                    Some(months) => check_all(
                        months.iter().map(|&m| i64::from(m)),
                        |n| MONTH_RANGE.contains(&n),
                        RuleError::InvalidMonth,
                    ),
                    None => Ok(()),
                }
            }
        }
    }

    /// The single-letter token that selects this rule's family.
    pub fn family_token(&self) -> &'static str {
        match self {
            Self::Daily { .. } => "d",
            Self::Yearly => "y",
            Self::Weekly { .. } => "w",
            Self::Monthly { .. } => "m",
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family_token())?;
        match self {
            Self::Daily { interval_days } => write!(f, " {interval_days}"),
            Self::Yearly => Ok(()),
            Self::Weekly { weekdays } => write!(f, " {}", join(weekdays)),
            Self::Monthly {
                day_selectors,
                months,
            } => {
                write!(f, " {}", join(day_selectors))?;
                if let Some(months) = months {
                    write!(f, " {}", join(months))?;
                }
                Ok(())
            }
        }
    }
}

// ── Family parsers ──────────────────────────────────────────────────────────

fn parse_daily(params: &[&str]) -> Result<RecurrenceRule> {
    let [token] = params else {
        return Err(RuleError::InvalidFormat(format!(
            "'d' takes exactly one interval, got {} parameters",
            params.len()
        )));
    };

    let interval_days = token
        .parse::<i64>()
        .ok()
        .filter(|n| (1..=i64::from(MAX_INTERVAL_DAYS)).contains(n))
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| RuleError::InvalidInterval(token.to_string()))?;

    Ok(RecurrenceRule::Daily { interval_days })
}

fn parse_yearly(params: &[&str]) -> Result<RecurrenceRule> {
    if !params.is_empty() {
        return Err(RuleError::InvalidFormat(format!(
            "'y' takes no parameters, got {}",
            params.len()
        )));
    }
    Ok(RecurrenceRule::Yearly)
}

fn parse_weekly(params: &[&str]) -> Result<RecurrenceRule> {
    let [token] = params else {
        return Err(RuleError::InvalidFormat(format!(
            "'w' takes exactly one weekday list, got {} parameters",
            params.len()
        )));
    };

    let weekdays = parse_list(
        token,
        |n| WEEKDAY_RANGE.contains(&n),
        RuleError::InvalidWeekday,
    )?
    .into_iter()
    .map(|n| n as u8)
    .collect();

    Ok(RecurrenceRule::Weekly { weekdays })
}

fn parse_monthly(params: &[&str]) -> Result<RecurrenceRule> {
    let (days_token, months_token) = match params {
        [days] => (*days, None),
        [days, months] => (*days, Some(*months)),
        _ => {
            return Err(RuleError::InvalidFormat(format!(
                "'m' takes a day list and an optional month list, got {} parameters",
                params.len()
            )));
        }
    };

    let day_selectors = parse_list(
        days_token,
        |n| n != 0 && DAY_OF_MONTH_RANGE.contains(&n),
        RuleError::InvalidDayOfMonth,
    )?
    .into_iter()
    .map(|n| n as i8)
    .collect();

    let months = months_token
        .map(|token| {
            parse_list(token, |n| MONTH_RANGE.contains(&n), RuleError::InvalidMonth)
        })
        .transpose()?
        .map(|list| list.into_iter().map(|n| n as u8).collect());

    Ok(RecurrenceRule::Monthly {
        day_selectors,
        months,
    })
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Parse a comma-separated integer list where every entry satisfies `valid`.
/// The first offending entry is reported through `invalid`.
fn parse_list(
    token: &str,
    valid: impl Fn(i64) -> bool,
    invalid: fn(String) -> RuleError,
) -> Result<Vec<i64>> {
    token
        .split(',')
        .map(|entry| {
            entry
                .parse::<i64>()
                .ok()
                .filter(|&n| valid(n))
                .ok_or_else(|| invalid(entry.to_string()))
        })
        .collect()
}

fn check_all(
    values: impl IntoIterator<Item = i64>,
    valid: impl Fn(i64) -> bool,
    invalid: fn(String) -> RuleError,
) -> Result<()> {
    match values.into_iter().find(|&n| !valid(n)) {
        Some(n) => Err(invalid(n.to_string())),
        None => Ok(()),
    }
}

fn join<T: fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
