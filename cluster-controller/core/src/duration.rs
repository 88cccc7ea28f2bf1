//! Durations in policy documents and cluster output are written in Go's
//! `time.Duration` string format, e.g. `5s`, `100ms` or `1m30s`.

use std::time::Duration;

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("invalid unit: {}", EXPECTED_UNITS)]
    InvalidUnit,

    #[error("missing a unit: {}", EXPECTED_UNITS)]
    NoUnit,

    #[error("durations must not be negative")]
    Negative,

    #[error("invalid floating-point number: {}", .0)]
    NotANumber(#[from] std::num::ParseFloatError),

    #[error("duration is too large")]
    Overflow,
}

const EXPECTED_UNITS: &str = "expected one of 'ns', 'us', '\u{00b5}s', 'ms', 's', 'm', or 'h'";

/// Parses a duration in Go's `time.ParseDuration` format.
///
/// Negative durations are rejected: no policy field accepts them.
pub fn parse(mut s: &str) -> Result<Duration, ParseError> {
    fn unit_duration(val: f64, unit: &str) -> Result<Duration, ParseError> {
        const MINUTE: Duration = Duration::from_secs(60);
        let base = match unit {
            "ns" => Duration::from_nanos(1),
            // U+00B5 is the "micro sign" while U+03BC is "Greek letter mu"
            "us" | "\u{00b5}s" | "\u{03bc}s" => Duration::from_micros(1),
            "ms" => Duration::from_millis(1),
            "s" => Duration::from_secs(1),
            "m" => MINUTE,
            "h" => MINUTE * 60,
            _ => return Err(ParseError::InvalidUnit),
        };
        if val.is_sign_negative() {
            return Err(ParseError::Negative);
        }
        if !val.is_finite() {
            return Err(ParseError::Overflow);
        }
        Duration::try_from_secs_f64(base.as_secs_f64() * val).map_err(|_| ParseError::Overflow)
    }

    if s.starts_with('-') {
        return Err(ParseError::Negative);
    }
    s = s.trim_start_matches('+');
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    while !s.is_empty() {
        let unit_start = s
            .find(|c: char| c.is_alphabetic())
            .ok_or(ParseError::NoUnit)?;
        let (val, rest) = s.split_at(unit_start);
        let val = val.parse::<f64>()?;
        let unit = match rest.find(|c: char| !c.is_alphabetic()) {
            Some(next) => {
                let (unit, rest) = rest.split_at(next);
                s = rest;
                unit
            }
            None => {
                s = "";
                rest
            }
        };
        total = total
            .checked_add(unit_duration(val, unit)?)
            .ok_or(ParseError::Overflow)?;
    }

    Ok(total)
}

/// Formats a duration so that [`parse`] reads it back, e.g. `5s` or `1.5s`.
pub fn format(duration: &Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    format!("{duration:?}")
}

/// Serde adapter for `Duration` fields.
pub mod string {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse(&s).map_err(de::Error::custom)
    }
}

/// Serde adapter for `Option<Duration>` fields.
pub mod option {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_some(&super::format(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse(&s).map_err(de::Error::custom))
            .transpose()
    }
}
