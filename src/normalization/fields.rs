//! Per-field conversions and acceptance filters

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

use crate::domain::ReleaseDate;

/// Digits inside parentheses, thousands separators tolerated: `(1,234)`, `(12 345)`
static REVIEW_COUNT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\(\s*(\d[\d,.\s]*)\)")
        .map_err(|e| error!(error = %e, "failed to compile review count pattern"))
        .ok()
});

/// Parse an integer literal, `default` on failure
pub fn to_int(raw: &str, default: i64) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(default)
}

/// `None` when `n` is below the acceptance threshold
pub fn num_reviews_filter(n: i64, threshold: i64) -> Option<i64> {
    (n >= threshold).then_some(n)
}

/// Whole days between `date` and `now`, negative for future dates
pub fn age_in_days(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - date).num_days()
}

/// Inclusive recency check: a date exactly `max_age_days` old still counts
pub fn is_recent(date: NaiveDate, max_age_days: i64, now: DateTime<Utc>) -> bool {
    age_in_days(date, now) <= max_age_days
}

/// Drop dates older than the recency window.
///
/// Raw strings always pass since their age cannot be computed.
pub fn release_date_filter(
    date: ReleaseDate,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Option<ReleaseDate> {
    match date {
        ReleaseDate::Date(d) if !is_recent(d, max_age_days, now) => None,
        other => Some(other),
    }
}

/// Largest parenthesised count across all fragments, 0 when none is found
pub fn extract_review_count<S: AsRef<str>>(fragments: &[S]) -> i64 {
    let Some(pattern) = REVIEW_COUNT.as_ref() else {
        return 0;
    };

    fragments
        .iter()
        .filter_map(|fragment| {
            let captures = pattern.captures(fragment.as_ref())?;
            let digits: String = captures
                .get(1)?
                .as_str()
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            Some(to_int(&digits, 0))
        })
        .max()
        .unwrap_or(0)
}

/// Text strictly between the first `>` and the last `<`, trimmed.
///
/// Input without a `>` followed later by a `<` is returned trimmed.
pub fn strip_wrapper(html: &str) -> String {
    match (html.find('>'), html.rfind('<')) {
        (Some(open), Some(close)) if open < close => html[open + 1..close].trim().to_string(),
        _ => html.trim().to_string(),
    }
}
