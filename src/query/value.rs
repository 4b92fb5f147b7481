//! Values that can appear on the right-hand side of a field restriction.

use std::fmt;
use std::ops::RangeInclusive;

/// Upper bound standing in for "no upper bound" in inclusive ranges
pub const UNBOUNDED_MAX: &str = "100000000000000000000";

/// Lower bound standing in for "no lower bound" in inclusive ranges
pub const UNBOUNDED_MIN: &str = "-100000000000000000000";

/// A value bound to a field in a predicate
///
/// Scalars render verbatim into the query grammar. `Range` carries two bounds
/// and is only meaningful for `between`-style restrictions.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Open range end, rendered as `*`
    Wildcard,
    /// Numeric sentinel rendered as [`UNBOUNDED_MAX`]
    Max,
    /// Numeric sentinel rendered as [`UNBOUNDED_MIN`]
    Min,
    Range(Box<SearchValue>, Box<SearchValue>),
}

impl SearchValue {
    /// Build a two-bound range
    pub fn range(lo: impl Into<SearchValue>, hi: impl Into<SearchValue>) -> Self {
        SearchValue::Range(Box::new(lo.into()), Box::new(hi.into()))
    }

    pub fn is_range(&self) -> bool {
        matches!(self, SearchValue::Range(_, _))
    }

    /// Bounds of a range, `None` for scalars
    pub fn bounds(&self) -> Option<(&SearchValue, &SearchValue)> {
        match self {
            SearchValue::Range(lo, hi) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Replace the lower bound, treating a scalar as the upper bound.
    pub(crate) fn with_lower(self, lower: SearchValue) -> SearchValue {
        match self {
            SearchValue::Range(_, hi) => SearchValue::Range(Box::new(lower), hi),
            scalar => SearchValue::Range(Box::new(lower), Box::new(scalar)),
        }
    }

    /// Replace the upper bound, treating a scalar as the lower bound.
    pub(crate) fn with_upper(self, upper: SearchValue) -> SearchValue {
        match self {
            SearchValue::Range(lo, _) => SearchValue::Range(lo, Box::new(upper)),
            scalar => SearchValue::Range(Box::new(scalar), Box::new(upper)),
        }
    }
}

impl fmt::Display for SearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchValue::Text(s) => f.write_str(s),
            SearchValue::Int(i) => write!(f, "{i}"),
            SearchValue::Float(x) => write!(f, "{x}"),
            SearchValue::Bool(b) => write!(f, "{b}"),
            SearchValue::Wildcard => f.write_str("*"),
            SearchValue::Max => f.write_str(UNBOUNDED_MAX),
            SearchValue::Min => f.write_str(UNBOUNDED_MIN),
            SearchValue::Range(lo, hi) => write!(f, "{lo} TO {hi}"),
        }
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        SearchValue::Text(value.to_string())
    }
}

impl From<String> for SearchValue {
    fn from(value: String) -> Self {
        SearchValue::Text(value)
    }
}

impl From<&String> for SearchValue {
    fn from(value: &String) -> Self {
        SearchValue::Text(value.clone())
    }
}

impl From<i32> for SearchValue {
    fn from(value: i32) -> Self {
        SearchValue::Int(i64::from(value))
    }
}

impl From<i64> for SearchValue {
    fn from(value: i64) -> Self {
        SearchValue::Int(value)
    }
}

impl From<u32> for SearchValue {
    fn from(value: u32) -> Self {
        SearchValue::Int(i64::from(value))
    }
}

impl From<u64> for SearchValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => SearchValue::Int(v),
            Err(_) => SearchValue::Text(value.to_string()),
        }
    }
}

impl From<usize> for SearchValue {
    fn from(value: usize) -> Self {
        SearchValue::from(value as u64)
    }
}

impl From<f32> for SearchValue {
    fn from(value: f32) -> Self {
        SearchValue::Float(f64::from(value))
    }
}

impl From<f64> for SearchValue {
    fn from(value: f64) -> Self {
        SearchValue::Float(value)
    }
}

impl From<bool> for SearchValue {
    fn from(value: bool) -> Self {
        SearchValue::Bool(value)
    }
}

impl<T: Into<SearchValue>> From<RangeInclusive<T>> for SearchValue {
    fn from(range: RangeInclusive<T>) -> Self {
        let (lo, hi) = range.into_inner();
        SearchValue::range(lo, hi)
    }
}

impl<A: Into<SearchValue>, B: Into<SearchValue>> From<(A, B)> for SearchValue {
    fn from((lo, hi): (A, B)) -> Self {
        SearchValue::range(lo, hi)
    }
}

impl<T: Into<SearchValue>> From<[T; 2]> for SearchValue {
    fn from([lo, hi]: [T; 2]) -> Self {
        SearchValue::range(lo, hi)
    }
}
