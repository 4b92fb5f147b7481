//! Unbound selector + options builder.
//!
//! [`SearchQuery`] accumulates restrictions and options without knowing which
//! model it will run against. Scope builders produce one, and
//! [`Criteria`](crate::Criteria) wraps one together with its result cache.

use serde::{Deserialize, Serialize};

use super::compiler::{self, Bounds, Operator};
use super::predicate::Predicate;
use super::value::SearchValue;

/// Options sent to the backend next to the selector
///
/// Absent `rows` / `start` leave the backend defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Comma-joined `"field direction"` clauses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    /// Offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
}

impl QueryOptions {
    /// Merge `other` into `self`; keys set on `other` win
    pub fn merge(&mut self, other: &QueryOptions) {
        if other.sort.is_some() {
            self.sort.clone_from(&other.sort);
        }
        if other.rows.is_some() {
            self.rows = other.rows;
        }
        if other.start.is_some() {
            self.start = other.start;
        }
    }

    fn push_sort(&mut self, clause: &str) {
        match self.sort.as_mut() {
            Some(sort) if !sort.is_empty() => {
                sort.push_str(", ");
                sort.push_str(clause);
            }
            _ => self.sort = Some(clause.to_string()),
        }
    }
}

/// Sort direction, rendered lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Argument accepted by [`SearchQuery::sort`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortSpec {
    /// Appended verbatim
    Raw(String),
    /// `field direction` clauses in call order
    Fields(Vec<(String, String)>),
}

impl SortSpec {
    fn clauses(&self) -> Vec<String> {
        match self {
            SortSpec::Raw(raw) => vec![raw.clone()],
            SortSpec::Fields(fields) => fields
                .iter()
                .map(|(field, direction)| format!("{field} {direction}"))
                .collect(),
        }
    }
}

impl From<&str> for SortSpec {
    fn from(raw: &str) -> Self {
        SortSpec::Raw(raw.to_string())
    }
}

impl From<String> for SortSpec {
    fn from(raw: String) -> Self {
        SortSpec::Raw(raw)
    }
}

impl<K: Into<String>> From<(K, SortDirection)> for SortSpec {
    fn from((field, direction): (K, SortDirection)) -> Self {
        SortSpec::Fields(vec![(field.into(), direction.as_str().to_string())])
    }
}

impl<K: Into<String>> From<(K, &str)> for SortSpec {
    fn from((field, direction): (K, &str)) -> Self {
        SortSpec::Fields(vec![(field.into(), direction.to_lowercase())])
    }
}

impl<K: Into<String>, const N: usize> From<[(K, SortDirection); N]> for SortSpec {
    fn from(fields: [(K, SortDirection); N]) -> Self {
        SortSpec::Fields(
            fields
                .into_iter()
                .map(|(field, direction)| (field.into(), direction.as_str().to_string()))
                .collect(),
        )
    }
}

impl<K: Into<String>> From<Vec<(K, SortDirection)>> for SortSpec {
    fn from(fields: Vec<(K, SortDirection)>) -> Self {
        SortSpec::Fields(
            fields
                .into_iter()
                .map(|(field, direction)| (field.into(), direction.as_str().to_string()))
                .collect(),
        )
    }
}

/// Argument accepted by `filter`: a raw fragment or a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Raw(String),
    Fields(Predicate),
}

impl Clause {
    fn compile(&self) -> String {
        match self {
            Clause::Raw(raw) => raw.clone(),
            Clause::Fields(predicate) => compiler::compile_pairs(predicate, Operator::And),
        }
    }
}

impl From<&str> for Clause {
    fn from(raw: &str) -> Self {
        Clause::Raw(raw.to_string())
    }
}

impl From<String> for Clause {
    fn from(raw: String) -> Self {
        Clause::Raw(raw)
    }
}

impl From<Predicate> for Clause {
    fn from(predicate: Predicate) -> Self {
        Clause::Fields(predicate)
    }
}

impl<K: Into<String>, V: Into<SearchValue>> From<(K, V)> for Clause {
    fn from(pair: (K, V)) -> Self {
        Clause::Fields(Predicate::from(pair))
    }
}

impl<K: Into<String>, V: Into<SearchValue>, const N: usize> From<[(K, V); N]> for Clause {
    fn from(pairs: [(K, V); N]) -> Self {
        Clause::Fields(Predicate::from(pairs))
    }
}

/// One or more predicates, each compiled into its own restriction
///
/// A single `(field, value)` pair or a [`Predicate`] is one predicate; arrays
/// and vectors yield one predicate per element.
pub trait IntoPredicates {
    fn into_predicates(self) -> Vec<Predicate>;
}

impl IntoPredicates for Predicate {
    fn into_predicates(self) -> Vec<Predicate> {
        vec![self]
    }
}

impl<K: Into<String>, V: Into<SearchValue>> IntoPredicates for (K, V) {
    fn into_predicates(self) -> Vec<Predicate> {
        vec![Predicate::from(self)]
    }
}

impl<P: Into<Predicate>> IntoPredicates for Vec<P> {
    fn into_predicates(self) -> Vec<Predicate> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<P: Into<Predicate>, const N: usize> IntoPredicates for [P; N] {
    fn into_predicates(self) -> Vec<Predicate> {
        self.into_iter().map(Into::into).collect()
    }
}

/// Accumulated selector text and options
///
/// Every restriction is wrapped in parentheses. The first one on an empty
/// selector carries no operator; later ones are joined with `AND` (or `OR`
/// inside a disjunction group).
///
/// # Example
///
/// ```
/// use lifeguard_search::{SearchQuery, SortDirection};
///
/// let query = SearchQuery::new()
///     .filter([("tags", "nerd"), ("name", "Joe")])
///     .or([("name", "Pants"), ("name", "Shirt")])
///     .sort(("name", SortDirection::Asc))
///     .limit(5);
///
/// assert_eq!(
///     query.selector(),
///     "(tags:nerd AND name:Joe) AND ((name:Pants) OR (name:Shirt))"
/// );
/// assert_eq!(query.options().sort.as_deref(), Some("name asc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    selector: String,
    options: QueryOptions,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// `true` when no restriction has been added
    pub fn is_blank(&self) -> bool {
        self.selector.trim().is_empty()
    }

    /// Append a raw fragment or an AND-joined predicate
    pub fn filter(mut self, clause: impl Into<Clause>) -> Self {
        self.add_filter(clause.into());
        self
    }

    /// Append a disjunction: `((a) OR (b))`
    pub fn or(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_any_of(predicates.into_predicates());
        self
    }

    /// Alias for [`or`](Self::or)
    pub fn any_of(self, predicates: impl IntoPredicates) -> Self {
        self.or(predicates)
    }

    /// Append inclusive ranges
    pub fn between(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_ranges(predicates.into_predicates(), Bounds::Inclusive);
        self
    }

    /// `field <= value`
    pub fn lte(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_bounded(predicates, compiler::at_most, Bounds::Inclusive);
        self
    }

    /// `field >= value`
    pub fn gte(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_bounded(predicates, compiler::at_least, Bounds::Inclusive);
        self
    }

    /// `field < value`
    pub fn lt(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_bounded(predicates, compiler::below, Bounds::Exclusive);
        self
    }

    /// `field > value`
    pub fn gt(mut self, predicates: impl IntoPredicates) -> Self {
        self.add_bounded(predicates, compiler::above, Bounds::Exclusive);
        self
    }

    /// Append sort clauses; earlier clauses are kept
    pub fn sort(mut self, spec: impl Into<SortSpec>) -> Self {
        self.add_sort(&spec.into());
        self
    }

    /// Alias for [`sort`](Self::sort)
    pub fn order_by(self, spec: impl Into<SortSpec>) -> Self {
        self.sort(spec)
    }

    /// Alias for [`sort`](Self::sort)
    pub fn order(self, spec: impl Into<SortSpec>) -> Self {
        self.sort(spec)
    }

    pub fn limit(mut self, rows: u64) -> Self {
        self.options.rows = Some(rows);
        self
    }

    /// Alias for [`limit`](Self::limit)
    pub fn rows(self, rows: u64) -> Self {
        self.limit(rows)
    }

    pub fn skip(mut self, start: u64) -> Self {
        self.options.start = Some(start);
        self
    }

    /// Alias for [`skip`](Self::skip)
    pub fn start(self, start: u64) -> Self {
        self.skip(start)
    }

    /// AND another query's selector onto this one and take its options
    pub fn merge(mut self, other: &SearchQuery) -> Self {
        self.add_merge(other);
        self
    }

    pub(crate) fn add_filter(&mut self, clause: Clause) {
        let fragment = clause.compile();
        self.push_restriction(&fragment, Operator::And);
    }

    pub(crate) fn add_any_of(&mut self, predicates: Vec<Predicate>) {
        let fragments = predicates
            .iter()
            .map(|p| compiler::compile_pairs(p, Operator::Or))
            .collect();
        self.push_group(fragments, Operator::Or);
    }

    pub(crate) fn add_ranges(&mut self, predicates: Vec<Predicate>, bounds: Bounds) {
        let fragments = predicates
            .iter()
            .map(|p| compiler::compile_ranges(p, bounds))
            .collect();
        self.push_group(fragments, Operator::And);
    }

    pub(crate) fn add_bounded(
        &mut self,
        predicates: impl IntoPredicates,
        transform: fn(Predicate) -> Predicate,
        bounds: Bounds,
    ) {
        let predicates = predicates.into_predicates().into_iter().map(transform).collect();
        self.add_ranges(predicates, bounds);
    }

    pub(crate) fn add_sort(&mut self, spec: &SortSpec) {
        for clause in spec.clauses() {
            self.options.push_sort(&clause);
        }
    }

    pub(crate) fn set_rows(&mut self, rows: u64) {
        self.options.rows = Some(rows);
    }

    pub(crate) fn set_start(&mut self, start: u64) {
        self.options.start = Some(start);
    }

    pub(crate) fn add_merge(&mut self, other: &SearchQuery) {
        self.push_restriction(&other.selector, Operator::And);
        self.options.merge(&other.options);
    }

    fn separator(&self, operator: Operator) -> Option<String> {
        if self.is_blank() || self.selector.ends_with('(') {
            None
        } else {
            Some(format!(" {operator} "))
        }
    }

    fn push_restriction(&mut self, fragment: &str, operator: Operator) {
        if fragment.trim().is_empty() {
            return;
        }
        if let Some(separator) = self.separator(operator) {
            self.selector.push_str(&separator);
        }
        self.selector.push('(');
        self.selector.push_str(fragment);
        self.selector.push(')');
    }

    /// Wrap `fragments` in one outer restriction, each fragment its own group
    fn push_group(&mut self, fragments: Vec<String>, inner: Operator) {
        let fragments: Vec<String> = fragments
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .collect();
        if fragments.is_empty() {
            return;
        }
        if let Some(separator) = self.separator(Operator::And) {
            self.selector.push_str(&separator);
        }
        self.selector.push('(');
        for fragment in &fragments {
            self.push_restriction(fragment, inner);
        }
        self.selector.push(')');
    }
}
