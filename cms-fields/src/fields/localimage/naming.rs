//! Stored filename construction
//!
//! Date prefixes are configured with moment-style patterns (`YYYY-MM-DD`)
//! because that is what content authors write in field options. Text in
//! square brackets is copied literally.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use std::fmt::Write;

/// Source of the current local time
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Longest tokens first so `MMMM` wins over `MM`
const TOKENS: &[&str] = &[
    "YYYY", "YY", "Q", "MMMM", "MMM", "MM", "M", "DDDD", "DDD", "DD", "Do", "D", "dddd", "ddd",
    "dd", "d", "HH", "H", "hh", "h", "mm", "m", "ss", "s", "SSS", "A", "a", "X", "x",
];

/// Formats `at` with a moment-style pattern
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use cms_fields::fields::localimage::format_moment;
///
/// let at = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(9, 7, 3).unwrap();
/// assert_eq!(format_moment("YYYY-MM-DD", &at), "2024-01-05");
/// assert_eq!(format_moment("[day] Do MMM, h:mm A", &at), "day 5th Jan, 9:07 AM");
/// ```
#[must_use]
pub fn format_moment(pattern: &str, at: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        if ch == '[' {
            if let Some(end) = rest.find(']') {
                out.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        if let Some(token) = TOKENS.iter().find(|token| rest.starts_with(**token)) {
            write_token(&mut out, token, at);
            rest = &rest[token.len()..];
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}

fn write_token(out: &mut String, token: &str, at: &NaiveDateTime) {
    let hour12 = match at.hour() % 12 {
        0 => 12,
        h => h,
    };
    let _ = match token {
        "YYYY" => write!(out, "{:04}", at.year()),
        "YY" => write!(out, "{:02}", at.year().rem_euclid(100)),
        "Q" => write!(out, "{}", at.month0() / 3 + 1),
        "MMMM" => write!(out, "{}", at.format("%B")),
        "MMM" => write!(out, "{}", at.format("%b")),
        "MM" => write!(out, "{:02}", at.month()),
        "M" => write!(out, "{}", at.month()),
        "DDDD" => write!(out, "{:03}", at.ordinal()),
        "DDD" => write!(out, "{}", at.ordinal()),
        "DD" => write!(out, "{:02}", at.day()),
        "Do" => write!(out, "{}{}", at.day(), ordinal_suffix(at.day())),
        "D" => write!(out, "{}", at.day()),
        "dddd" => write!(out, "{}", at.format("%A")),
        "ddd" => write!(out, "{}", at.format("%a")),
        "dd" => write!(out, "{}", &at.format("%a").to_string()[..2]),
        "d" => write!(out, "{}", at.weekday().num_days_from_sunday()),
        "HH" => write!(out, "{:02}", at.hour()),
        "H" => write!(out, "{}", at.hour()),
        "hh" => write!(out, "{hour12:02}"),
        "h" => write!(out, "{hour12}"),
        "mm" => write!(out, "{:02}", at.minute()),
        "m" => write!(out, "{}", at.minute()),
        "ss" => write!(out, "{:02}", at.second()),
        "s" => write!(out, "{}", at.second()),
        "SSS" => write!(out, "{:03}", at.nanosecond() / 1_000_000 % 1000),
        "A" => write!(out, "{}", if at.hour() < 12 { "AM" } else { "PM" }),
        "a" => write!(out, "{}", if at.hour() < 12 { "am" } else { "pm" }),
        "X" => write!(out, "{}", at.and_utc().timestamp()),
        "x" => write!(out, "{}", at.and_utc().timestamp_millis()),
        other => write!(out, "{other}"),
    };
}

const fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Builds the candidate stored name: optional `<date>-` prefix plus `name`
#[must_use]
pub fn prefixed_filename(date_prefix: Option<&str>, at: &NaiveDateTime, name: &str) -> String {
    match date_prefix {
        Some(pattern) if !pattern.is_empty() => format!("{}-{name}", format_moment(pattern, at)),
        _ => name.to_string(),
    }
}
