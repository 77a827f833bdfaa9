//! Primitive type inference for ConfigMap values.
//!
//! # Responsibilities
//! - Classify a raw string as the most specific primitive it represents
//! - Re-parse a string strictly under a given primitive kind
//!
//! # Design Decisions
//! - Inference is a linear search over [`PrimitiveKind::INFERENCE_ORDER`]
//! - Formats are locale-invariant; numbers use `.` as decimal separator
//! - Temporal kinds accept fixed round-trip formats only, never a lenient
//!   "anything that looks like a date" parser

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

/// Largest day component accepted in a duration.
const MAX_DURATION_DAYS: i64 = 10_675_199;

/// Primitive kinds a configuration value can be inferred as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Int32,
    Int64,
    Single,
    Double,
    TimeOfDay,
    Date,
    DateTime,
    Duration,
    String,
}

/// A value parsed under one [`PrimitiveKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    TimeOfDay(NaiveTime),
    Date(NaiveDate),
    /// Offset-qualified inputs are converted to UTC.
    DateTime(NaiveDateTime),
    Duration(TimeDelta),
    String(String),
}

impl PrimitiveKind {
    /// Order in which kinds are tried by [`infer`]. The first match wins.
    pub const INFERENCE_ORDER: [PrimitiveKind; 10] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Single,
        PrimitiveKind::Double,
        PrimitiveKind::TimeOfDay,
        PrimitiveKind::Date,
        PrimitiveKind::DateTime,
        PrimitiveKind::Duration,
        PrimitiveKind::String,
    ];

    /// Parse `value` strictly as this kind.
    ///
    /// Surrounding whitespace is ignored for every kind except
    /// [`PrimitiveKind::String`], which accepts anything verbatim.
    pub fn parse(self, value: &str) -> Option<PrimitiveValue> {
        let trimmed = value.trim();
        match self {
            PrimitiveKind::Boolean => parse_bool(trimmed).map(PrimitiveValue::Boolean),
            PrimitiveKind::Int32 => trimmed.parse().ok().map(PrimitiveValue::Int32),
            PrimitiveKind::Int64 => trimmed.parse().ok().map(PrimitiveValue::Int64),
            PrimitiveKind::Single => parse_single(trimmed).map(PrimitiveValue::Single),
            PrimitiveKind::Double => parse_double(trimmed).map(PrimitiveValue::Double),
            PrimitiveKind::TimeOfDay => parse_time(trimmed).map(PrimitiveValue::TimeOfDay),
            PrimitiveKind::Date => parse_date(trimmed).map(PrimitiveValue::Date),
            PrimitiveKind::DateTime => parse_date_time(trimmed).map(PrimitiveValue::DateTime),
            PrimitiveKind::Duration => parse_duration(trimmed).map(PrimitiveValue::Duration),
            PrimitiveKind::String => Some(PrimitiveValue::String(value.to_string())),
        }
    }

    /// Whether `value` parses as this kind.
    pub fn accepts(self, value: &str) -> bool {
        self.parse(value).is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Single => "single",
            PrimitiveKind::Double => "double",
            PrimitiveKind::TimeOfDay => "time_of_day",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "date_time",
            PrimitiveKind::Duration => "duration",
            PrimitiveKind::String => "string",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PrimitiveValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveValue::Boolean(_) => PrimitiveKind::Boolean,
            PrimitiveValue::Int32(_) => PrimitiveKind::Int32,
            PrimitiveValue::Int64(_) => PrimitiveKind::Int64,
            PrimitiveValue::Single(_) => PrimitiveKind::Single,
            PrimitiveValue::Double(_) => PrimitiveKind::Double,
            PrimitiveValue::TimeOfDay(_) => PrimitiveKind::TimeOfDay,
            PrimitiveValue::Date(_) => PrimitiveKind::Date,
            PrimitiveValue::DateTime(_) => PrimitiveKind::DateTime,
            PrimitiveValue::Duration(_) => PrimitiveKind::Duration,
            PrimitiveValue::String(_) => PrimitiveKind::String,
        }
    }
}

/// Infer the most specific primitive `value` represents.
pub fn infer(value: &str) -> PrimitiveValue {
    PrimitiveKind::INFERENCE_ORDER
        .iter()
        .find_map(|kind| kind.parse(value))
        .unwrap_or_else(|| PrimitiveValue::String(value.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_infinity_literal(value: &str) -> bool {
    let unsigned = value.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

// `f32::from_str` saturates to infinity; such values belong to a wider kind.
fn parse_single(value: &str) -> Option<f32> {
    let parsed: f32 = value.parse().ok()?;
    if parsed.is_infinite() && !is_infinity_literal(value) {
        return None;
    }
    Some(parsed)
}

fn parse_double(value: &str) -> Option<f64> {
    let parsed: f64 = value.parse().ok()?;
    if parsed.is_infinite() && !is_infinity_literal(value) {
        return None;
    }
    Some(parsed)
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .filter(|time| !is_leap_second(time))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(with_offset) => with_offset.naive_utc(),
        Err(_) => DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())?,
    };
    Some(parsed).filter(|date_time| !is_leap_second(date_time))
}

// chrono represents second 60 as a nanosecond overflow.
fn is_leap_second<T: Timelike>(time: &T) -> bool {
    time.nanosecond() >= 1_000_000_000
}

/// Parse the constant duration format `[-][d.]hh:mm[:ss[.fffffff]]`.
fn parse_duration(value: &str) -> Option<TimeDelta> {
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let first_colon = body.find(':')?;
    let (days, clock) = match body[..first_colon].find('.') {
        Some(dot) => (parse_digits(&body[..dot], 8)?, &body[dot + 1..]),
        None => (0, body),
    };
    if days > MAX_DURATION_DAYS {
        return None;
    }

    let mut parts = clock.splitn(3, ':');
    let hours = parse_clock_component(parts.next()?, 23)?;
    let minutes = parse_clock_component(parts.next()?, 59)?;
    let (seconds, nanos) = match parts.next() {
        Some(seconds) => parse_seconds(seconds)?,
        None => (0, 0),
    };

    let total = TimeDelta::try_days(days)?
        + TimeDelta::try_hours(hours)?
        + TimeDelta::try_minutes(minutes)?
        + TimeDelta::try_seconds(seconds)?
        + TimeDelta::nanoseconds(nanos);

    Some(if negative { -total } else { total })
}

fn parse_digits(value: &str, max_len: usize) -> Option<i64> {
    if value.is_empty() || value.len() > max_len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_clock_component(value: &str, max: i64) -> Option<i64> {
    parse_digits(value, 2).filter(|component| *component <= max)
}

fn parse_seconds(value: &str) -> Option<(i64, i64)> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };
    let seconds = parse_clock_component(whole, 59)?;
    let nanos = match fraction {
        Some(fraction) => {
            // Seven fractional digits, i.e. 100ns ticks.
            let digits = parse_digits(fraction, 7)?;
            let scale = 10i64.pow(9 - fraction.len() as u32);
            digits * scale
        }
        None => 0,
    };
    Some((seconds, nanos))
}
