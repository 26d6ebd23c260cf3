//! Durations and points in time, as they appear in values and query specs.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use ifqlc_parser::lexer::lr::DurationSegment;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

const NANOSECOND: i64 = 1;
const MICROSECOND: i64 = 1_000 * NANOSECOND;
const MILLISECOND: i64 = 1_000 * MICROSECOND;
const SECOND: i64 = 1_000 * MILLISECOND;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// A signed length of time with nanosecond precision.
///
/// Written as `1h30m`, `-4h` or `0s`: units from largest to smallest, zero
/// parts omitted. Parsing additionally accepts the `d`, `w` and `y` units of
/// the language (fixed multiples of 24 hours).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Duration(secs * SECOND)
    }

    pub const fn from_hours(hours: i64) -> Self {
        Duration(hours * HOUR)
    }

    pub const fn nanoseconds(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Sums the segments of a duration literal. `None` on overflow.
    pub fn from_segments(segments: &[DurationSegment]) -> Option<Self> {
        ifqlc_parser::lexer::lr::duration_nanoseconds(segments).map(Duration)
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.0.checked_neg().map(Duration)
    }

    pub fn checked_add(self, other: Duration) -> Option<Self> {
        self.0.checked_add(other.0).map(Duration)
    }

    pub fn checked_sub(self, other: Duration) -> Option<Self> {
        self.0.checked_sub(other.0).map(Duration)
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }

        let mut rest = self.0.unsigned_abs();
        for (unit, name) in [
            (HOUR, "h"),
            (MINUTE, "m"),
            (SECOND, "s"),
            (MILLISECOND, "ms"),
            (MICROSECOND, "us"),
            (NANOSECOND, "ns"),
        ] {
            let unit = unit as u64;
            let count = rest / unit;
            if count > 0 {
                write!(f, "{count}{name}")?;
            }
            rest %= unit;
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::new_simple(format!("invalid duration {s:?}"));

        let (negative, mut rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if rest.is_empty() {
            return Err(invalid());
        }

        // i128 leaves room for the magnitude of `i64::MIN`
        let mut total: i128 = 0;
        while !rest.is_empty() {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(invalid)?;
            if digits == 0 {
                return Err(invalid());
            }
            let magnitude: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(rest.len());
            let unit = match &rest[..unit_len] {
                "ns" => NANOSECOND,
                "us" | "µs" | "μs" => MICROSECOND,
                "ms" => MILLISECOND,
                "s" => SECOND,
                "m" => MINUTE,
                "h" => HOUR,
                "d" => DAY,
                "w" => 7 * DAY,
                "y" => 365 * DAY,
                _ => return Err(invalid()),
            };
            rest = &rest[unit_len..];

            total += i128::from(magnitude) * i128::from(unit);
            if total > i128::from(i64::MAX) + 1 {
                return Err(invalid());
            }
        }

        let total = if negative { -total } else { total };
        i64::try_from(total).map(Duration).map_err(|_| invalid())
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "a duration string such as `1h30m`")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
                Duration::from_str(v).map_err(|e| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(DurationVisitor)
    }
}

/// A bound of a time range: either relative to the moment the query runs, or
/// an absolute instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Time {
    Relative(Duration),
    Absolute(DateTime<Utc>),
}

impl Time {
    pub const NOW: Time = Time::Relative(Duration::ZERO);

    pub fn is_relative(&self) -> bool {
        matches!(self, Time::Relative(_))
    }

    /// The instant this bound refers to, given the time the query runs.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Time::Relative(d) => now + chrono::Duration::nanoseconds(d.nanoseconds()),
            Time::Absolute(t) => *t,
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Time::NOW
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Time::Relative(d) if *d == Duration::ZERO => f.write_str("now"),
            Time::Relative(d) => Display::fmt(d, f),
            Time::Absolute(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl FromStr for Time {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "now" {
            return Ok(Time::NOW);
        }
        if let Ok(d) = Duration::from_str(s) {
            return Ok(Time::Relative(d));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|t| Time::Absolute(t.with_timezone(&Utc)))
            .map_err(|_| Error::new_simple(format!("invalid time {s:?}")))
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Time::from_str(&s).map_err(|e| de::Error::custom(e.to_string()))
    }
}
