//! Next-occurrence computation for recurring tasks.
//!
//! Given a task's anchor date, its repeat rule and a reference "now", compute
//! the next date on which the task is due. Every function here is pure: the
//! caller supplies "now", nothing reads a clock, and nothing is cached between
//! calls.
//!
//! # Comparison against "now"
//!
//! | Family  | Starts from            | Accepts                       |
//! |---------|------------------------|-------------------------------|
//! | Daily   | anchor + 1 interval    | first date strictly after now |
//! | Yearly  | anchor + 1 year        | first date on or after now    |
//! | Weekly  | now                    | nearest listed weekday > now  |
//! | Monthly | anchor (or now + 1 day)| first matching day > now      |
//!
//! The yearly rule is the only one that accepts `now` itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::date::CalendarDate;
use crate::error::{Result, RuleError};
use crate::resolver::resolve_month_days;
use crate::rule::RecurrenceRule;

/// Month steps a monthly search may take before giving up.
///
/// Feb 29 can be eight years apart (2096 → 2104), so `m 29 2` needs 96
/// steps in the worst case.
pub const DEFAULT_MONTH_SEARCH_LIMIT: u32 = 120;

/// Tunables for [`Evaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Upper bound on months visited by a monthly rule. A rule that cannot
    /// match within this many months (`m 31 2`, `m 30 2,4`) is reported as
    /// [`RuleError::SearchExhausted`] instead of looping.
    pub month_search_limit: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            month_search_limit: DEFAULT_MONTH_SEARCH_LIMIT,
        }
    }
}

/// Evaluates repeat rules under a fixed [`EvaluatorConfig`].
///
/// Holds no state besides its configuration, so a single instance can be
/// shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Compute the next due date from the raw stored strings.
    ///
    /// # Arguments
    ///
    /// * `anchor` — The task's stored date, `YYYYMMDD`
    /// * `now` — The reference date
    /// * `rule_text` — The task's repeat rule (see [`crate::rule`])
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidAnchorFormat`] if `anchor` is malformed
    /// (checked before the rule), any parse error of [`RecurrenceRule::parse`],
    /// or [`RuleError::SearchExhausted`] for a monthly rule with no reachable date.
    ///
    /// # Examples
    ///
    /// ```
    /// use repeat_engine::{CalendarDate, Evaluator};
    ///
    /// let now = CalendarDate::parse("20240301").unwrap();
    /// let next = Evaluator::default().next_date("20240115", now, "m -1").unwrap();
    /// assert_eq!(next.to_string(), "20240331");
    /// ```
    pub fn next_date(
        &self,
        anchor: &str,
        now: CalendarDate,
        rule_text: &str,
    ) -> Result<CalendarDate> {
        let anchor = CalendarDate::parse(anchor)?;
        let rule = RecurrenceRule::parse(rule_text)
            .inspect_err(|err| debug!(rule = rule_text, %err, "rejected repeat rule"))?;
        self.next_after(&rule, anchor, now)
    }

    /// Compute the next due date for an already parsed rule.
    ///
    /// # Errors
    ///
    /// Returns the [`RecurrenceRule::validate`] error for a hand-built rule that
    /// breaks the grammar's invariants, [`RuleError::SearchExhausted`] if a
    /// monthly search runs past the configured limit, or
    /// [`RuleError::DateOutOfRange`] if the result is not representable.
    pub fn next_after(
        &self,
        rule: &RecurrenceRule,
        anchor: CalendarDate,
        now: CalendarDate,
    ) -> Result<CalendarDate> {
        rule.validate()?;

        match rule {
            RecurrenceRule::Daily { interval_days } => next_daily(anchor, now, *interval_days),
            RecurrenceRule::Yearly => next_yearly(anchor, now),
            RecurrenceRule::Weekly { weekdays } => next_weekly(now, weekdays),
            RecurrenceRule::Monthly {
                day_selectors,
                months,
            } => self.next_monthly(anchor, now, day_selectors, months.as_ref()),
        }
    }

    fn next_monthly(
        &self,
        anchor: CalendarDate,
        now: CalendarDate,
        day_selectors: &[i8],
        months: Option<&BTreeSet<u8>>,
    ) -> Result<CalendarDate> {
        let limit = self.config.month_search_limit;
        let allowed = |month: u32| months.is_none_or(|set| set.contains(&(month as u8)));

        // Nothing on or before `now` can match, so start past it.
        let mut cursor = anchor.max(now.add_days(1)?);

        for step in 0..limit {
            trace!(step, %cursor, "monthly search step");
            if allowed(cursor.month()) {
                let valid_days = resolve_month_days(cursor.year(), cursor.month(), day_selectors);
                if let Some(found) = scan_month(cursor, &valid_days, now) {
                    return Ok(found);
                }
            }
            cursor = cursor.first_of_next_month()?;
        }

        warn!(limit, %anchor, %now, "monthly search exhausted");
        Err(RuleError::SearchExhausted { limit })
    }
}

/// Compute the next due date with the default configuration.
///
/// Shorthand for `Evaluator::default().next_date(anchor, now, rule_text)`.
///
/// # Examples
///
/// ```
/// use repeat_engine::{next_date, CalendarDate, RuleError};
///
/// let now = CalendarDate::parse("20240301").unwrap();
/// assert_eq!(next_date("20240101", now, "w 1,3").unwrap().to_string(), "20240304");
/// assert_eq!(
///     next_date("20240101", now, "x 5"),
///     Err(RuleError::UnknownRuleType("x".to_string()))
/// );
/// ```
pub fn next_date(
    anchor: &str,
    now: CalendarDate,
    rule_text: &str,
) -> Result<CalendarDate> {
    Evaluator::default().next_date(anchor, now, rule_text)
}

// ── Family evaluators ───────────────────────────────────────────────────────

/// First `anchor + k * interval` (k >= 1) strictly after `now`.
fn next_daily(
    anchor: CalendarDate,
    now: CalendarDate,
    interval_days: u16,
) -> Result<CalendarDate> {
    let interval = u64::from(interval_days);
    let elapsed = now.naive().signed_duration_since(anchor.naive()).num_days();

    // Jump over the intervals that cannot pass `now`; at most two checks remain.
    let mut steps = u64::try_from(elapsed).map_or(0, |days| days / interval).max(1);
    loop {
        let candidate = anchor.add_days(steps * interval)?;
        if candidate > now {
            return Ok(candidate);
        }
        steps += 1;
    }
}

/// First `anchor + k years` (k >= 1) on or after `now`.
///
/// Years are added from the anchor each time rather than accumulated, so a
/// Feb 29 anchor falls on Feb 28 in common years and returns to Feb 29 in
/// leap years.
fn next_yearly(anchor: CalendarDate, now: CalendarDate) -> Result<CalendarDate> {
    let mut years = u32::try_from(now.year() - anchor.year()).map_or(1, |y| y.max(1));
    loop {
        let months = years.checked_mul(12).ok_or(RuleError::DateOutOfRange)?;
        let candidate = anchor.add_months(months)?;
        if candidate >= now {
            return Ok(candidate);
        }
        years += 1;
    }
}

/// Nearest listed weekday after `now`. Today's weekday counts as next week.
fn next_weekly(now: CalendarDate, weekdays: &BTreeSet<u8>) -> Result<CalendarDate> {
    let today = now.iso_weekday();
    let nearest = weekdays
        .iter()
        .map(|&weekday| {
            let weekday = u32::from(weekday);
            if weekday <= today {
                weekday + 7
            } else {
                weekday
            }
        })
        .min()
        .ok_or_else(|| RuleError::InvalidFormat("'w' needs at least one weekday".to_string()))?;

    now.add_days(u64::from(nearest - today))
}

/// First day from `cursor` to the end of its month that is in `valid_days`
/// and strictly after `now`.
fn scan_month(
    cursor: CalendarDate,
    valid_days: &BTreeSet<u32>,
    now: CalendarDate,
) -> Option<CalendarDate> {
    valid_days
        .range(cursor.day()..)
        .filter_map(|&day| CalendarDate::from_ymd(cursor.year(), cursor.month(), day))
        .find(|&date| date > now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> CalendarDate {
        CalendarDate::parse(s).unwrap()
    }

    fn next(anchor: &str, now: &str, rule: &str) -> String {
        next_date(anchor, d(now), rule).unwrap().to_string()
    }

    // ── dispatch and errors ─────────────────────────────────────────────

    #[test]
    fn test_invalid_anchor_checked_first() {
        assert_eq!(
            next_date("2024-01-01", d("20240101"), ""),
            Err(RuleError::InvalidAnchorFormat("2024-01-01".to_string()))
        );
        assert_eq!(
            next_date("20240230", d("20240101"), "d 1"),
            Err(RuleError::InvalidAnchorFormat("20240230".to_string()))
        );
    }

    #[test]
    fn test_empty_rule() {
        assert_eq!(
            next_date("20240101", d("20240101"), ""),
            Err(RuleError::EmptyRule)
        );
        assert_eq!(
            next_date("20240101", d("20240101"), "  "),
            Err(RuleError::EmptyRule)
        );
    }

    #[test]
    fn test_rejected_rules() {
        let now = d("20240101");
        assert_eq!(
            next_date("20240101", now, "d 401"),
            Err(RuleError::InvalidInterval("401".to_string()))
        );
        assert_eq!(
            next_date("20240101", now, "m 0"),
            Err(RuleError::InvalidDayOfMonth("0".to_string()))
        );
        assert_eq!(
            next_date("20240101", now, "x 5"),
            Err(RuleError::UnknownRuleType("x".to_string()))
        );
        assert_eq!(
            next_date("20240101", now, "w 8"),
            Err(RuleError::InvalidWeekday("8".to_string()))
        );
        assert_eq!(
            next_date("20240101", now, "m 1 13"),
            Err(RuleError::InvalidMonth("13".to_string()))
        );
    }

    #[test]
    fn test_hand_built_rule_is_validated() {
        let rule = RecurrenceRule::Daily { interval_days: 500 };
        assert_eq!(
            Evaluator::default().next_after(&rule, d("20240101"), d("20240101")),
            Err(RuleError::InvalidInterval("500".to_string()))
        );
    }

    // ── daily ───────────────────────────────────────────────────────────

    #[test]
    fn test_daily_lands_on_anchor_multiple() {
        // 20240101 + 4 * 3 days; the 12th is not a multiple of 3 from the anchor.
        assert_eq!(next("20240101", "20240110", "d 3"), "20240113");
    }

    #[test]
    fn test_daily_is_strictly_after_now() {
        // 20240101 + 2 * 3 = 20240107 == now, so one more step.
        assert_eq!(next("20240101", "20240107", "d 3"), "20240110");
        assert_eq!(next("20240110", "20240110", "d 1"), "20240111");
    }

    #[test]
    fn test_daily_future_anchor_still_advances() {
        assert_eq!(next("20240120", "20240110", "d 5"), "20240125");
    }

    #[test]
    fn test_daily_max_interval_across_leap_year() {
        assert_eq!(next("20240101", "20240101", "d 400"), "20250204");
    }

    #[test]
    fn test_daily_long_gap() {
        assert_eq!(next("20200101", "20240301", "d 1"), "20240302");
        // 1521 days elapsed; 218 * 7 = 1526.
        assert_eq!(next("20200101", "20240301", "d 7"), "20240306");
    }

    // ── yearly ──────────────────────────────────────────────────────────

    #[test]
    fn test_yearly_basic() {
        assert_eq!(next("20231231", "20240101", "y"), "20241231");
        assert_eq!(next("20000515", "20240601", "y"), "20250515");
    }

    #[test]
    fn test_yearly_accepts_now_itself() {
        // Yearly accepts `now` itself (>=); daily never does (>).
        assert_eq!(next("20200315", "20240315", "y"), "20240315");
        assert_eq!(next("20200315", "20240315", "d 1"), "20240316");
    }

    #[test]
    fn test_yearly_future_anchor_still_advances() {
        assert_eq!(next("20300101", "20240101", "y"), "20310101");
    }

    #[test]
    fn test_yearly_leap_day_clamps_to_feb_28() {
        // chrono's month addition clamps Feb 29 to Feb 28 in common years.
        assert_eq!(next("20240229", "20250101", "y"), "20250228");
    }

    #[test]
    fn test_yearly_leap_day_returns_in_leap_years() {
        assert_eq!(next("20240229", "20270601", "y"), "20280229");
        assert_eq!(next("20240229", "20250301", "y"), "20260228");
    }

    // ── weekly ──────────────────────────────────────────────────────────

    #[test]
    fn test_weekly_next_monday_from_friday() {
        // 20240301 is a Friday.
        assert_eq!(next("20240101", "20240301", "w 1,3"), "20240304");
    }

    #[test]
    fn test_weekly_same_weekday_moves_a_week() {
        // 20240304 is a Monday.
        assert_eq!(next("20240101", "20240304", "w 1"), "20240311");
    }

    #[test]
    fn test_weekly_later_this_week() {
        assert_eq!(next("20240101", "20240304", "w 7"), "20240310");
        assert_eq!(next("20240101", "20240304", "w 5,2"), "20240305");
    }

    #[test]
    fn test_weekly_from_sunday() {
        // 20240303 is a Sunday (ISO 7).
        assert_eq!(next("20240101", "20240303", "w 7"), "20240310");
        assert_eq!(next("20240101", "20240303", "w 6,1"), "20240304");
    }

    #[test]
    fn test_weekly_ignores_anchor() {
        assert_eq!(next("20000101", "20240301", "w 3"), "20240306");
        assert_eq!(next("20300101", "20240301", "w 3"), "20240306");
    }

    // ── monthly ─────────────────────────────────────────────────────────

    #[test]
    fn test_monthly_last_day_after_passed_february() {
        assert_eq!(next("20240115", "20240301", "m -1"), "20240331");
    }

    #[test]
    fn test_monthly_last_day_of_february() {
        assert_eq!(next("20240201", "20240201", "m -1"), "20240229");
        assert_eq!(next("20230201", "20230201", "m -1"), "20230228");
    }

    #[test]
    fn test_monthly_31_skips_30_day_month() {
        assert_eq!(next("20240401", "20240401", "m 31"), "20240531");
    }

    #[test]
    fn test_monthly_anchor_after_now() {
        assert_eq!(next("20240110", "20240101", "m 1,15"), "20240115");
        // The anchor day itself qualifies when it is after now.
        assert_eq!(next("20240101", "20231215", "m 1"), "20240101");
    }

    #[test]
    fn test_monthly_second_to_last() {
        assert_eq!(next("20240101", "20240215", "m -2,10"), "20240228");
    }

    #[test]
    fn test_monthly_month_filter_wraps_year() {
        assert_eq!(next("20240101", "20240315", "m 10 3"), "20250310");
    }

    #[test]
    fn test_monthly_month_filter_from_month_end() {
        // Advancing from Jan 31 lands on Feb 1, never skipping February.
        assert_eq!(next("20240131", "20240101", "m 5 2"), "20240205");
    }

    #[test]
    fn test_monthly_feb_29_waits_for_leap_year() {
        assert_eq!(next("20230101", "20230101", "m 29 2"), "20240229");
    }

    #[test]
    fn test_monthly_old_anchor() {
        assert_eq!(next("20000101", "20240310", "m 1"), "20240401");
    }

    #[test]
    fn test_monthly_feb_29_across_skipped_century_leap_year() {
        // 2100 is not a leap year.
        assert_eq!(next("20960301", "20960301", "m 29 2"), "21040229");
        assert_eq!(next("20970301", "20970301", "m 29 2"), "21040229");
        assert_eq!(next("20960101", "20960101", "m 29 2"), "20960229");
    }

    #[test]
    fn test_monthly_impossible_rule_exhausts() {
        assert_eq!(
            next_date("20240101", d("20240101"), "m 31 2,4"),
            Err(RuleError::SearchExhausted {
                limit: DEFAULT_MONTH_SEARCH_LIMIT
            })
        );
        assert_eq!(
            next_date("20240101", d("20240101"), "m -31 2"),
            Err(RuleError::SearchExhausted {
                limit: DEFAULT_MONTH_SEARCH_LIMIT
            })
        );
    }

    #[test]
    fn test_monthly_custom_search_limit() {
        let evaluator = Evaluator::new(EvaluatorConfig {
            month_search_limit: 5,
        });
        assert_eq!(
            evaluator.next_date("20240101", d("20240101"), "m 1 12"),
            Err(RuleError::SearchExhausted { limit: 5 })
        );
        assert_eq!(
            evaluator
                .next_date("20240101", d("20240101"), "m 1 5")
                .unwrap()
                .to_string(),
            "20240501"
        );
    }

    // ── config ──────────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: EvaluatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EvaluatorConfig::default());
        assert_eq!(config.month_search_limit, 120);
    }

    #[test]
    fn test_config_from_json() {
        let config: EvaluatorConfig =
            serde_json::from_str(r#"{"month_search_limit": 120}"#).unwrap();
        assert_eq!(Evaluator::new(config).config().month_search_limit, 120);
    }
}
