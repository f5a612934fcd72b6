//! Month-day resolution: signed day selectors → concrete days of one month.

use std::collections::BTreeSet;

use crate::date::days_in_month;

/// Resolve day selectors against the actual length of `month` in `year`.
///
/// - `d > 0` is the d-th day, kept only if the month has that many days.
/// - `d < 0` counts back from the last day: `-1` is the last day, `-2` the
///   one before. A selector reaching past the 1st (e.g. `-31` in April) is
///   dropped the same way an overlong positive selector is.
///
/// Selectors that do not fit contribute nothing; this is not an error, the
/// caller moves on to the next month.
///
/// # Examples
///
/// ```
/// use repeat_engine::resolver::resolve_month_days;
///
/// let days = resolve_month_days(2024, 2, &[-1, 30, 1]);
/// assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![1, 29]);
/// ```
pub fn resolve_month_days(year: i32, month: u32, selectors: &[i8]) -> BTreeSet<u32> {
    let length = i64::from(days_in_month(year, month));

    selectors
        .iter()
        .filter_map(|&selector| {
            let selector = i64::from(selector);
            let day = if selector > 0 {
                selector
            } else {
                length + selector + 1
            };
            (1..=length).contains(&day).then_some(day as u32)
        })
        .collect()
}
