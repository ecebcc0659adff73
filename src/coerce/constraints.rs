use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::ParamValue;

/// 2^63, the first `f64` above `i64::MAX`
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Value constraints on a path parameter.
///
/// Bounds apply to numeric values (`int`, `float`, `decimal`), lengths to `str` and `path`
/// values, and `pattern` to the text form of any value. A value failing a constraint is
/// treated like a value that failed coercion: the route tree backtracks past it.
///
/// ```rust
/// use strata_router::coerce::{ParamConstraints, ParamValue};
///
/// let positive = ParamConstraints::default().gt(0.0);
/// assert!(positive.check(&ParamValue::Int(1)).is_ok());
/// assert!(positive.check(&ParamValue::Int(0)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParamConstraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
}

impl PartialEq for ParamConstraints {
    fn eq(&self, other: &Self) -> bool {
        self.gt == other.gt
            && self.ge == other.ge
            && self.lt == other.lt
            && self.le == other.le
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern.as_ref().map(Regex::as_str) == other.pattern.as_ref().map(Regex::as_str)
    }
}

impl ParamConstraints {
    #[must_use]
    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    #[must_use]
    pub fn ge(mut self, bound: f64) -> Self {
        self.ge = Some(bound);
        self
    }

    #[must_use]
    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    #[must_use]
    pub fn le(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Require the value's text form to match `pattern` (unanchored, add `^...$` as needed)
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// `true` when no constraint is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gt.is_none()
            && self.ge.is_none()
            && self.lt.is_none()
            && self.le.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }

    /// Check a coerced value.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn check(&self, value: &ParamValue) -> Result<(), String> {
        if matches!(
            value,
            ParamValue::Int(_) | ParamValue::Float(_) | ParamValue::Decimal(_)
        ) {
            let bounds: [(Option<f64>, &str, fn(Ordering) -> bool); 4] = [
                (self.gt, ">", Ordering::is_gt),
                (self.ge, ">=", Ordering::is_ge),
                (self.lt, "<", Ordering::is_lt),
                (self.le, "<=", Ordering::is_le),
            ];
            for (bound, op, holds) in bounds {
                if let Some(bound) = bound {
                    if !compare(value, bound).is_some_and(holds) {
                        return Err(format!("{value} must be {op} {bound}"));
                    }
                }
            }
        }

        if let Some(text) = value.as_str() {
            let len = text.chars().count();
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(format!("length {len} is shorter than {min}"));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(format!("length {len} is longer than {max}"));
                }
            }
        }

        if let Some(pattern) = &self.pattern {
            let text = value.to_string();
            if !pattern.is_match(&text) {
                return Err(format!("'{text}' does not match {}", pattern.as_str()));
            }
        }

        Ok(())
    }
}

/// Order a numeric value against an `f64` bound without routing integers through `f64`
fn compare(value: &ParamValue, bound: f64) -> Option<Ordering> {
    match value {
        ParamValue::Int(v) => compare_int(*v, bound),
        ParamValue::Decimal(v) => match Decimal::from_f64(bound) {
            Some(bound) => Some(v.cmp(&bound)),
            None => v.to_f64()?.partial_cmp(&bound),
        },
        ParamValue::Float(v) => v.partial_cmp(&bound),
        _ => None,
    }
}

fn compare_int(value: i64, bound: f64) -> Option<Ordering> {
    if bound.is_nan() {
        return None;
    }
    if bound >= I64_LIMIT {
        return Some(Ordering::Less);
    }
    if bound < -I64_LIMIT {
        return Some(Ordering::Greater);
    }
    let floor = bound.floor();
    // Exact: floor is integral and inside the i64 range
    let whole = floor as i64;
    Some(match value.cmp(&whole) {
        Ordering::Equal if floor == bound => Ordering::Equal,
        Ordering::Greater => Ordering::Greater,
        _ => Ordering::Less,
    })
}
