//! Predicate → query grammar compilation.
//!
//! Pure functions turning a [`Predicate`] into a Lucene-style fragment:
//!
//! ```text
//! field:value                 equality
//! field:[lo TO hi]            inclusive range
//! field:{lo TO hi}            exclusive range
//! field: value                scalar inside a range restriction
//! ```
//!
//! Fragments are not parenthesized here; [`SearchQuery`](super::SearchQuery)
//! wraps each one into a restriction.

use std::fmt;

use super::predicate::Predicate;
use super::value::SearchValue;

/// Boolean operator joining fields and restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether range endpoints match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    /// `[lo TO hi]`
    Inclusive,
    /// `{lo TO hi}`
    Exclusive,
}

impl Bounds {
    fn delimiters(&self) -> (char, char) {
        match self {
            Bounds::Inclusive => ('[', ']'),
            Bounds::Exclusive => ('{', '}'),
        }
    }
}

/// Compile `field:value` pairs joined by `operator`
///
/// A range value inside an equality predicate compiles as an inclusive range.
///
/// # Example
///
/// ```
/// use lifeguard_search::query::compiler::{compile_pairs, Operator};
/// use lifeguard_search::Predicate;
///
/// let predicate = Predicate::new().with("tags", "nerd").with("name", "Joe");
/// assert_eq!(compile_pairs(&predicate, Operator::And), "tags:nerd AND name:Joe");
/// ```
pub fn compile_pairs(predicate: &Predicate, operator: Operator) -> String {
    predicate
        .iter()
        .map(|(field, value)| match value.bounds() {
            Some((lo, hi)) => range_term(field, lo, hi, Bounds::Inclusive),
            None => format!("{field}:{value}"),
        })
        .collect::<Vec<_>>()
        .join(&format!(" {operator} "))
}

/// Compile range terms, always joined with `AND`
///
/// Scalars keep the backend's `field: value` form (with the space).
///
/// # Example
///
/// ```
/// use lifeguard_search::query::compiler::{compile_ranges, Bounds};
/// use lifeguard_search::Predicate;
///
/// let predicate = Predicate::new().with("availability", 1..=3).with("price", [12, 20]);
/// assert_eq!(
///     compile_ranges(&predicate, Bounds::Inclusive),
///     "availability:[1 TO 3] AND price:[12 TO 20]"
/// );
/// ```
pub fn compile_ranges(predicate: &Predicate, bounds: Bounds) -> String {
    predicate
        .iter()
        .map(|(field, value)| match value.bounds() {
            Some((lo, hi)) => range_term(field, lo, hi, bounds),
            None => format!("{field}: {value}"),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn range_term(field: &str, lo: &SearchValue, hi: &SearchValue, bounds: Bounds) -> String {
    let (open, close) = bounds.delimiters();
    format!("{field}:{open}{lo} TO {hi}{close}")
}

/// `lte`: open the lower end with the numeric sentinel
///
/// The sentinel is [`UNBOUNDED_MIN`](super::value::UNBOUNDED_MIN), the
/// negative `-10^20`, so `price:[-100000000000000000000 TO 5]` also matches
/// negative values. A positive `10^20` lower bound would exceed any
/// realistic upper bound and match nothing.
pub fn at_most(predicate: Predicate) -> Predicate {
    predicate.map_values(|value| value.with_lower(SearchValue::Min))
}

/// `gte`: open the upper end with the numeric sentinel
pub fn at_least(predicate: Predicate) -> Predicate {
    predicate.map_values(|value| value.with_upper(SearchValue::Max))
}

/// `lt`: open the lower end with `*`, compiled exclusive
pub fn below(predicate: Predicate) -> Predicate {
    predicate.map_values(|value| value.with_lower(SearchValue::Wildcard))
}

/// `gt`: open the upper end with `*`, compiled exclusive
pub fn above(predicate: Predicate) -> Predicate {
    predicate.map_values(|value| value.with_upper(SearchValue::Wildcard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::value::{UNBOUNDED_MAX, UNBOUNDED_MIN};

    #[test]
    fn test_pairs_and() {
        let predicate = Predicate::new()
            .with("tags", "nerd")
            .with("name", "Joe")
            .with("something", 2);
        assert_eq!(
            compile_pairs(&predicate, Operator::And),
            "tags:nerd AND name:Joe AND something:2"
        );
    }

    #[test]
    fn test_pairs_or() {
        let predicate = Predicate::new().with("name", "Pants").with("name2", "Shirt");
        assert_eq!(
            compile_pairs(&predicate, Operator::Or),
            "name:Pants OR name2:Shirt"
        );
    }

    #[test]
    fn test_pairs_empty() {
        assert_eq!(compile_pairs(&Predicate::new(), Operator::And), "");
    }

    #[test]
    fn test_ranges_exclusive() {
        let predicate = Predicate::new().with("quantity", (SearchValue::Wildcard, 10));
        assert_eq!(
            compile_ranges(&predicate, Bounds::Exclusive),
            "quantity:{* TO 10}"
        );
    }

    #[test]
    fn test_ranges_scalar_keeps_space() {
        let predicate = Predicate::new().with("color", "red").with("size", 1..=2);
        assert_eq!(
            compile_ranges(&predicate, Bounds::Inclusive),
            "color: red AND size:[1 TO 2]"
        );
    }

    #[test]
    fn test_gte_uses_upper_sentinel() {
        let predicate = at_least(Predicate::new().with("x", 5));
        assert_eq!(
            compile_ranges(&predicate, Bounds::Inclusive),
            format!("x:[5 TO {UNBOUNDED_MAX}]")
        );
    }

    #[test]
    fn test_lte_uses_lower_sentinel() {
        let predicate = at_most(Predicate::new().with("x", 5));
        assert_eq!(
            compile_ranges(&predicate, Bounds::Inclusive),
            format!("x:[{UNBOUNDED_MIN} TO 5]")
        );
    }

    #[test]
    fn test_strict_bounds_use_wildcard() {
        let lt = below(Predicate::new().with("x", 5));
        assert_eq!(compile_ranges(&lt, Bounds::Exclusive), "x:{* TO 5}");

        let gt = above(Predicate::new().with("quantity", 0).with("ratings", 5));
        assert_eq!(
            compile_ranges(&gt, Bounds::Exclusive),
            "quantity:{0 TO *} AND ratings:{5 TO *}"
        );
    }
}
