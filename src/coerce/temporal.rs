use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use super::is_decimal_literal;

/// Integer timestamps above this magnitude are milliseconds, not seconds.
const MILLISECOND_THRESHOLD: i64 = 20_000_000_000;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 60.0 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: f64 = 24.0 * SECONDS_PER_HOUR;

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let value: i64 = raw.parse().ok()?;
    if value.abs() > MILLISECOND_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// `YYYY-MM-DD` or an integer unix timestamp.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| timestamp(raw).map(|ts| ts.date_naive()))
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.ffffff`.
pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// RFC 3339, a naive ISO datetime (taken as UTC) or an integer unix timestamp.
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    let naive = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());

    if let Some(naive) = naive {
        return Some(naive.and_utc().fixed_offset());
    }

    timestamp(raw).map(|ts| ts.fixed_offset())
}

/// ISO 8601 duration (`P1D`, `PT1H1S`, `P1Y2M3W4DT5H6M7.5S`) or a number of seconds.
pub(crate) fn parse_timedelta(raw: &str) -> Option<TimeDelta> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let seconds = if body.starts_with('P') || body.starts_with('p') {
        parse_iso8601_seconds(body)?
    } else if is_decimal_literal(body) {
        body.parse::<f64>().ok()?
    } else {
        return None;
    };

    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::microseconds(micros as i64);
    Some(if negative { -delta } else { delta })
}

/// Total seconds of an ISO 8601 duration.
///
/// Years count as 365 days and months as 30 days.
fn parse_iso8601_seconds(input: &str) -> Option<f64> {
    let input = input.to_ascii_uppercase();
    let mut chars = input.chars();

    if chars.next() != Some('P') {
        return None;
    }

    let mut total = 0.0;
    let mut in_time_part = false;
    let mut components = 0;
    let mut time_components = 0;
    let mut current = String::new();

    for c in chars {
        let unit = match c {
            'T' if !in_time_part && current.is_empty() => {
                in_time_part = true;
                continue;
            }
            '0'..='9' | '.' | ',' => {
                current.push(if c == ',' { '.' } else { c });
                continue;
            }
            'Y' if !in_time_part => 365.0 * SECONDS_PER_DAY,
            'M' if !in_time_part => 30.0 * SECONDS_PER_DAY,
            'W' if !in_time_part => 7.0 * SECONDS_PER_DAY,
            'D' if !in_time_part => SECONDS_PER_DAY,
            'H' if in_time_part => SECONDS_PER_HOUR,
            'M' if in_time_part => SECONDS_PER_MINUTE,
            'S' if in_time_part => 1.0,
            _ => return None,
        };

        if !is_decimal_literal(&current) {
            return None;
        }
        let value: f64 = current.parse().ok()?;
        total += value * unit;
        current.clear();
        components += 1;
        if in_time_part {
            time_components += 1;
        }
    }

    // Trailing digits without a designator, an empty duration, or a bare `T` are invalid.
    if !current.is_empty() || components == 0 || (in_time_part && time_components == 0) {
        return None;
    }

    Some(total)
}

/// Render a duration as ISO 8601 seconds, e.g. `PT3661S` or `-PT0.5S`.
pub(crate) fn format_timedelta(delta: &TimeDelta) -> String {
    let sign = if *delta < TimeDelta::zero() { "-" } else { "" };
    let abs = delta.abs();
    let secs = abs.num_seconds();
    let micros = abs.subsec_nanos() / 1_000;
    if micros == 0 {
        format!("{sign}PT{secs}S")
    } else {
        let fraction = format!("{micros:06}");
        format!("{sign}PT{secs}.{}S", fraction.trim_end_matches('0'))
    }
}
