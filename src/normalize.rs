//! Interpretation of raw cell values as numbers, percentages, and dates.
//!
//! Every statistical component reads cells through [`to_number`]; the type
//! detector additionally uses the structural tests [`is_percentage`],
//! [`is_date_like`] and [`is_numeric_like`].

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::data::Value;

static PERCENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]+(?:\.[0-9]+)?)\s*%$").expect("percent pattern compiles")
});

/// Longest leading decimal literal, the way a lenient float reader scans.
static LEADING_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("leading decimal pattern compiles")
});

static ISO_DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("iso pattern compiles"));

static DELIMITED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2})[/\-.]([0-9]{1,2})[/\-.]([0-9]{2,4})$")
        .expect("delimited date pattern compiles")
});

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Currency and grouping symbols ignored by the detector's numeric test.
const NUMERIC_NOISE: &[char] = &[',', '%', '£', '$', '€'];

/// Numeric interpretation used by every aggregate.
///
/// Percent strings keep their literal magnitude (`"45%"` is `45`, not `0.45`).
/// Thousands separators are stripped, then the leading number is read, so
/// unit suffixes are ignored (`"12 kg"` is `12`). Missing values, text with
/// no numeric prefix and non-finite results yield `None`.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if n.is_nan() => None,
        Value::Number(n) => Some(*n),
        Value::Text(text) => parse_numeric_text(text),
        Value::Missing | Value::Date(_) => None,
    }
}

pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(captures) = PERCENT_PATTERN.captures(trimmed) {
        return captures[1].parse::<f64>().ok();
    }
    let cleaned = trimmed.replace(',', "");
    LEADING_DECIMAL
        .find(&cleaned)
        .and_then(|prefix| prefix.as_str().parse::<f64>().ok())
        .filter(|parsed| parsed.is_finite())
}

/// Structural percent test: optional sign, digits, optional fraction,
/// optional whitespace, then `%`, with nothing else around it.
pub fn is_percentage(value: &Value) -> bool {
    match value {
        Value::Text(text) => PERCENT_PATTERN.is_match(text.trim()),
        _ => false,
    }
}

/// Looser numeric test used during type detection: currency symbols,
/// percent signs and grouping commas are ignored.
pub fn is_numeric_like(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::Text(text) => {
            let stripped = text.trim().replace(NUMERIC_NOISE, "");
            let stripped = stripped.trim();
            !stripped.is_empty() && stripped.parse::<f64>().is_ok_and(|n| !n.is_nan())
        }
        Value::Missing | Value::Date(_) => false,
    }
}

pub fn is_date_like(value: &Value) -> bool {
    to_date(value).is_some()
}

pub fn to_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(dt) => Some(*dt),
        Value::Text(text) => parse_date(text),
        Value::Missing | Value::Number(_) => None,
    }
}

/// Accepts ISO dates (`YYYY-MM-DD` with an optional time part) and
/// `D/M/Y`-style dates delimited by `/`, `-` or `.`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if ISO_DATE_PREFIX.is_match(trimmed) {
        return parse_iso_date(trimmed);
    }
    let captures = DELIMITED_DATE.captures(trimmed)?;
    let first = captures[1].parse::<u32>().ok()?;
    let second = captures[2].parse::<u32>().ok()?;
    let year = expand_year(&captures[3])?;
    // Month-first reading wins when both are valid calendar dates.
    NaiveDate::from_ymd_opt(year, first, second)
        .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn parse_iso_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    if let Some(parsed) = ISO_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn expand_year(digits: &str) -> Option<i32> {
    let year = digits.parse::<i32>().ok()?;
    if digits.len() == 2 {
        Some(if year < 50 { 2000 + year } else { 1900 + year })
    } else {
        Some(year)
    }
}

/// Trimmed, non-empty string form of a present value.
pub fn label(value: &Value) -> Option<String> {
    if value.is_missing() {
        return None;
    }
    let display = value.as_display();
    let trimmed = display.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
