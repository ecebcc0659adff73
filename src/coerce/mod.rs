//! # Coercion Module
//!
//! Converts raw path-parameter strings into typed [`ParamValue`]s according to their
//! declared [`ParamType`].
//!
//! Coercion runs while the route tree is being descended. A failure is not an error for the
//! client: it rules out that branch of the tree and matching backtracks to the next sibling.
//!
//! | type | value | accepted |
//! |---|---|---|
//! | `str` | `String` | any segment |
//! | `path` | `String` | remaining path, normalized with a leading `/` |
//! | `int` | `i64` | optional sign and digits |
//! | `float` | `f64` | optional sign, digits, optional `.` fraction |
//! | `decimal` | `Decimal` | optional sign, digits, optional `.` fraction |
//! | `uuid` | `Uuid` | hyphenated or simple RFC 4122 text |
//! | `date` | `NaiveDate` | `YYYY-MM-DD` or unix timestamp |
//! | `time` | `NaiveTime` | `HH:MM[:SS[.f]]` |
//! | `datetime` | `DateTime<FixedOffset>` | RFC 3339, naive ISO (UTC) or unix timestamp |
//! | `timedelta` | `TimeDelta` | ISO 8601 duration or seconds |

mod constraints;
mod temporal;

pub use constraints::ParamConstraints;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::path::{normalize_path, ParamType};

/// A coerced path-parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// `str`
    Str(String),
    /// `path`
    Path(String),
    /// `int`
    Int(i64),
    /// `float`
    Float(f64),
    /// `decimal`
    Decimal(Decimal),
    /// `uuid`
    Uuid(Uuid),
    /// `date`
    Date(NaiveDate),
    /// `time`
    Time(NaiveTime),
    /// `datetime`
    DateTime(DateTime<FixedOffset>),
    /// `timedelta`
    TimeDelta(TimeDelta),
}

impl ParamValue {
    /// The type this value belongs to
    #[must_use]
    pub fn kind(&self) -> ParamType {
        match self {
            ParamValue::Str(_) => ParamType::Str,
            ParamValue::Path(_) => ParamType::Path,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Decimal(_) => ParamType::Decimal,
            ParamValue::Uuid(_) => ParamType::Uuid,
            ParamValue::Date(_) => ParamType::Date,
            ParamValue::Time(_) => ParamType::Time,
            ParamValue::DateTime(_) => ParamType::DateTime,
            ParamValue::TimeDelta(_) => ParamType::TimeDelta,
        }
    }

    /// Text of a `str` or `path` value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) | ParamValue::Path(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of `int`, `float` and `decimal` values
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ParamValue::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ParamValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            ParamValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            ParamValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timedelta(&self) -> Option<TimeDelta> {
        match self {
            ParamValue::TimeDelta(v) => Some(*v),
            _ => None,
        }
    }

    /// JSON representation handed to handlers
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Int(v) => Value::from(*v),
            ParamValue::Float(v) => Value::from(*v),
            other => Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(v) | ParamValue::Path(v) => f.write_str(v),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Decimal(v) => write!(f, "{v}"),
            ParamValue::Uuid(v) => write!(f, "{}", v.hyphenated()),
            ParamValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            ParamValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            ParamValue::DateTime(v) => f.write_str(&v.to_rfc3339()),
            ParamValue::TimeDelta(v) => f.write_str(&temporal::format_timedelta(v)),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Int(v) => serializer.serialize_i64(*v),
            ParamValue::Float(v) => serializer.serialize_f64(*v),
            other => serializer.collect_str(other),
        }
    }
}

macro_rules! param_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::$variant(value.into())
            }
        })*
    };
}

param_value_from! {
    String => Str,
    &str => Str,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    Decimal => Decimal,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<FixedOffset> => DateTime,
    TimeDelta => TimeDelta,
}

/// A raw value could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    /// Declared type
    pub kind: ParamType,
    /// Raw input
    pub raw: String,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {} value", self.raw, self.kind)
    }
}

impl std::error::Error for CoercionError {}

/// `[+-]digits[.digits]`
pub(crate) fn is_decimal_literal(raw: &str) -> bool {
    let body = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);
    let (int_part, fraction) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let frac = fraction.unwrap_or_default();
    (!int_part.is_empty() || !frac.is_empty()) && digits(int_part) && digits(frac)
}

/// Coerce a raw string into `kind`.
///
/// For `path` parameters `raw` is the whole unconsumed remainder of the request path.
///
/// # Errors
///
/// Returns [`CoercionError`] when `raw` is not an accepted form of `kind`.
pub fn coerce(kind: ParamType, raw: &str) -> Result<ParamValue, CoercionError> {
    let value = match kind {
        ParamType::Str => (!raw.is_empty()).then(|| ParamValue::Str(raw.to_string())),
        ParamType::Path => Some(ParamValue::Path(normalize_path(raw))),
        ParamType::Int => {
            let body = raw.strip_prefix(&['-', '+'][..]).unwrap_or(raw);
            if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
                raw.parse().ok().map(ParamValue::Int)
            } else {
                None
            }
        }
        ParamType::Float => is_decimal_literal(raw)
            .then(|| raw.parse().ok().map(ParamValue::Float))
            .flatten(),
        ParamType::Decimal => is_decimal_literal(raw)
            .then(|| Decimal::from_str(raw).ok().map(ParamValue::Decimal))
            .flatten(),
        ParamType::Uuid => Uuid::try_parse(raw).ok().map(ParamValue::Uuid),
        ParamType::Date => temporal::parse_date(raw).map(ParamValue::Date),
        ParamType::Time => temporal::parse_time(raw).map(ParamValue::Time),
        ParamType::DateTime => temporal::parse_datetime(raw).map(ParamValue::DateTime),
        ParamType::TimeDelta => temporal::parse_timedelta(raw).map(ParamValue::TimeDelta),
    };

    value.ok_or_else(|| CoercionError {
        kind,
        raw: raw.to_string(),
    })
}
