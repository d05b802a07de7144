//! Duration Parsing Module
//!
//! Turns human-readable TTL strings ("10 seconds", "1 day", "300") into seconds.

use tracing::warn;

/// TTL used when a duration string cannot be understood
pub const DEFAULT_DURATION_SECS: u64 = 3600;

const SECOND: f64 = 1.0;
const MINUTE: f64 = 60.0;
const HOUR: f64 = 3600.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const MONTH: f64 = DAY * 30.0;

/// Parses `input` into whole seconds.
///
/// Accepted forms are a bare number of seconds, or `<number> <unit>` where
/// the unit is second, minute, hour, day, week or month, in any case and
/// with an optional trailing "s". Unknown units count as zero. A number that
/// does not parse, or parses to zero, counts as 1. Anything else resolves to
/// [`DEFAULT_DURATION_SECS`].
pub fn parse_duration(input: &str) -> u64 {
    match try_parse(input) {
        Some(secs) => secs,
        None => {
            warn!(input, default = DEFAULT_DURATION_SECS, "unparsable cache duration, using default");
            DEFAULT_DURATION_SECS
        }
    }
}

fn try_parse(input: &str) -> Option<u64> {
    if input.ends_with(|c: char| c.is_ascii_digit()) {
        return parse_bare_seconds(input.trim());
    }

    let (amount, unit) = split_amount_unit(input)?;
    let amount = match parse_float_prefix(amount) {
        Some(n) if n != 0.0 => n,
        _ => 1.0,
    };
    Some(to_seconds(amount * unit_multiplier(unit)))
}

fn parse_bare_seconds(input: &str) -> Option<u64> {
    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return input.parse().ok();
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(to_seconds)
}

/// Splits "<[digits.,]+><optional single whitespace><word chars>".
fn split_amount_unit(input: &str) -> Option<(&str, &str)> {
    let amount_end = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(input.len());
    if amount_end == 0 {
        return None;
    }
    let (amount, rest) = input.split_at(amount_end);

    let mut chars = rest.chars();
    let unit = match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => rest,
    };

    if unit.is_empty() || !unit.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((amount, unit))
}

/// Longest leading prefix of `s` that parses as a float.
fn parse_float_prefix(s: &str) -> Option<f64> {
    (1..=s.len())
        .rev()
        .filter(|&end| s.is_char_boundary(end))
        .find_map(|end| s[..end].parse::<f64>().ok())
}

fn unit_multiplier(unit: &str) -> f64 {
    let unit = unit.to_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);
    match unit {
        "second" => SECOND,
        "minute" => MINUTE,
        "hour" => HOUR,
        "day" => DAY,
        "week" => WEEK,
        "month" => MONTH,
        _ => 0.0,
    }
}

fn to_seconds(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}
