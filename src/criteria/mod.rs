//! Chainable search criteria with deferred execution.
//!
//! A [`Criteria`] records restrictions and options through its chainable
//! operations and only talks to the backend when a result is observed
//! ([`total`](Criteria::total), [`document_ids`](Criteria::document_ids),
//! [`documents`](Criteria::documents)). The raw response, the parsed ids and
//! the materialised records are cached until the next mutation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lifeguard_search::Searchable;
//! use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
//!
//! let backend = Arc::new(MockBackend::returning_ids(&["1", "2"]));
//! let store = Arc::new(MemoryStore::from_records([("1", "Pants"), ("2", "Shirt")]));
//! let products: Searchable<&str> = Searchable::new("products", backend.clone(), store);
//!
//! let mut criteria = products.filter(("tags", "x")).limit(5);
//! assert_eq!(criteria.document_ids()?, ["1", "2"]);
//! assert_eq!(criteria.documents()?, ["Pants", "Shirt"]);
//! assert_eq!(backend.call_count(), 1);
//! # Ok::<(), lifeguard_search::CriteriaError>(())
//! ```

pub mod error;
pub(crate) mod response;

pub use error::CriteriaError;

use serde_json::{Map, Value};
use std::fmt;

use crate::model::Searchable;
use crate::query::{Clause, IntoPredicates, QueryOptions, SearchQuery, SearchValue, SortSpec};
use crate::query::{compiler, Bounds};
use crate::scope::{Extension, ScopeBuilder, ScopeContext};
use response::ParsedResponse;

/// Results of the current cache epoch
struct ResultCache<R> {
    response: Option<Value>,
    parsed: Option<ParsedResponse>,
    documents: Option<Vec<R>>,
}

impl<R> Default for ResultCache<R> {
    fn default() -> Self {
        Self {
            response: None,
            parsed: None,
            documents: None,
        }
    }
}

/// Search criteria bound to a [`Searchable`] model
///
/// Chainable operations take `self` by value and return it, so one instance
/// flows through the whole chain. Every mutation drops the cached results.
pub struct Criteria<R> {
    model: Searchable<R>,
    query: SearchQuery,
    extensions: Extension<R>,
    cache: ResultCache<R>,
}

impl<R> fmt::Debug for Criteria<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("collection", &self.model.collection())
            .field("selector", &self.query.selector())
            .field("options", self.query.options())
            .field("extensions", &self.extensions.names())
            .field("cached", &self.is_cached())
            .finish()
    }
}

impl<R> Criteria<R> {
    /// Empty criteria for `model`; no default scope is applied
    pub fn new(model: Searchable<R>) -> Self {
        Self::with_query(model, SearchQuery::new())
    }

    /// Criteria for `model` starting from `query`
    pub fn with_query(model: Searchable<R>, query: SearchQuery) -> Self {
        Self {
            model,
            query,
            extensions: Extension::new(),
            cache: ResultCache::default(),
        }
    }

    pub fn model(&self) -> &Searchable<R> {
        &self.model
    }

    /// Selector and options accumulated so far
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn selector(&self) -> &str {
        self.query.selector()
    }

    pub fn options(&self) -> &QueryOptions {
        self.query.options()
    }

    /// `true` once documents were materialised in the current cache epoch
    pub fn is_cached(&self) -> bool {
        self.cache.documents.is_some()
    }

    /// Raw backend response of the current cache epoch, if any
    pub fn response(&self) -> Option<&Value> {
        self.cache.response.as_ref()
    }
}

impl<R: 'static> Criteria<R> {
    /// Copy with the same selector, options and extensions and an empty cache
    pub fn fork(&self) -> Self {
        Self {
            model: self.model.clone(),
            query: self.query.clone(),
            extensions: self.extensions.clone(),
            cache: ResultCache::default(),
        }
    }

    fn invalidate(&mut self) {
        self.cache = ResultCache::default();
    }

    /// Append a raw fragment or an AND-joined predicate
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use lifeguard_search::Searchable;
    /// # use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
    /// # let model: Searchable<String> =
    /// #     Searchable::new("people", Arc::new(MockBackend::new()), Arc::new(MemoryStore::new()));
    /// let criteria = model
    ///     .criteria()
    ///     .filter([("tags", "nerd"), ("name", "Joe")])
    ///     .filter("something:2");
    /// assert_eq!(criteria.selector(), "(tags:nerd AND name:Joe) AND (something:2)");
    /// ```
    pub fn filter(mut self, clause: impl Into<Clause>) -> Self {
        self.query.add_filter(clause.into());
        self.invalidate();
        self
    }

    /// Append a disjunction, one alternative per predicate
    pub fn or(mut self, predicates: impl IntoPredicates) -> Self {
        self.query.add_any_of(predicates.into_predicates());
        self.invalidate();
        self
    }

    /// Alias for [`or`](Self::or)
    pub fn any_of(self, predicates: impl IntoPredicates) -> Self {
        self.or(predicates)
    }

    /// Append inclusive ranges; values should be ranges or pairs
    pub fn between(mut self, predicates: impl IntoPredicates) -> Self {
        self.query
            .add_ranges(predicates.into_predicates(), Bounds::Inclusive);
        self.invalidate();
        self
    }

    pub fn lte(mut self, predicates: impl IntoPredicates) -> Self {
        self.query
            .add_bounded(predicates, compiler::at_most, Bounds::Inclusive);
        self.invalidate();
        self
    }

    pub fn gte(mut self, predicates: impl IntoPredicates) -> Self {
        self.query
            .add_bounded(predicates, compiler::at_least, Bounds::Inclusive);
        self.invalidate();
        self
    }

    pub fn lt(mut self, predicates: impl IntoPredicates) -> Self {
        self.query
            .add_bounded(predicates, compiler::below, Bounds::Exclusive);
        self.invalidate();
        self
    }

    pub fn gt(mut self, predicates: impl IntoPredicates) -> Self {
        self.query
            .add_bounded(predicates, compiler::above, Bounds::Exclusive);
        self.invalidate();
        self
    }

    /// Append sort clauses after any existing ones
    pub fn sort(mut self, spec: impl Into<SortSpec>) -> Self {
        self.query.add_sort(&spec.into());
        self.invalidate();
        self
    }

    pub fn order_by(self, spec: impl Into<SortSpec>) -> Self {
        self.sort(spec)
    }

    pub fn order(self, spec: impl Into<SortSpec>) -> Self {
        self.sort(spec)
    }

    pub fn limit(mut self, rows: u64) -> Self {
        self.query.set_rows(rows);
        self.invalidate();
        self
    }

    pub fn rows(self, rows: u64) -> Self {
        self.limit(rows)
    }

    pub fn skip(mut self, start: u64) -> Self {
        self.query.set_start(start);
        self.invalidate();
        self
    }

    pub fn start(self, start: u64) -> Self {
        self.skip(start)
    }

    /// AND `other`'s selector onto this one; `other`'s options win
    pub fn merge(mut self, other: &SearchQuery) -> Self {
        self.query.add_merge(other);
        self.invalidate();
        self
    }

    /// [`merge`](Self::merge) with another criteria's selector and options
    pub fn merge_criteria<S>(self, other: &Criteria<S>) -> Self {
        self.merge(&other.query)
    }

    /// Attach extra named operations, reachable through [`call`](Self::call)
    pub fn with_extension(mut self, extension: &Extension<R>) -> Self {
        self.extensions.extend(extension);
        self
    }

    /// Whether [`call`](Self::call) can dispatch `name`
    pub fn has_operation(&self, name: &str) -> bool {
        self.extensions.contains(name) || self.model.responds_to(name)
    }

    /// Dispatch a named operation
    ///
    /// Extension operations attached by a scope run first. Otherwise the call
    /// goes to the model's scopes and finders with `self` pushed on the scope
    /// stack of `ctx`, so whatever the model builds continues from this
    /// criteria. The frame is popped on every exit path.
    ///
    /// # Errors
    ///
    /// `CriteriaError::UnknownOperation` when neither side knows `name`, or
    /// whatever the operation itself returns.
    pub fn call(
        self,
        ctx: &mut ScopeContext,
        name: &str,
        args: &[SearchValue],
    ) -> Result<Criteria<R>, CriteriaError> {
        if let Some(op) = self.extensions.get(name) {
            return op(self, args);
        }
        if !self.model.responds_to(name) {
            return Err(CriteriaError::UnknownOperation(name.to_string()));
        }
        let model = self.model.clone();
        let mut guard = ctx.push(self);
        model.call(&mut guard, name, args)
    }

    /// Run the search now, replacing any cached response
    ///
    /// Prefer [`total`](Self::total), [`document_ids`](Self::document_ids) or
    /// [`documents`](Self::documents), which execute at most once per cache
    /// epoch.
    ///
    /// # Errors
    ///
    /// `EmptySelector` without restrictions (the backend is not called),
    /// `QueryFailed` when the backend fails.
    pub fn execute(&mut self) -> Result<&Value, CriteriaError> {
        if self.query.is_blank() {
            return Err(CriteriaError::EmptySelector);
        }
        self.invalidate();
        let options = self.effective_options();
        match self.model.search(self.query.selector(), &options) {
            Ok(raw) => Ok(self.cache.response.insert(raw)),
            Err(err) => Err(self.fail(err.to_string())),
        }
    }

    /// Number of matches reported by the backend
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute); malformed responses are `QueryFailed`.
    pub fn total(&mut self) -> Result<u64, CriteriaError> {
        self.ensure_parsed().map(|parsed| parsed.total)
    }

    /// Matched identifiers in backend order
    ///
    /// # Errors
    ///
    /// See [`total`](Self::total).
    pub fn document_ids(&mut self) -> Result<&[String], CriteriaError> {
        self.ensure_parsed().map(|parsed| parsed.document_ids.as_slice())
    }

    /// Matched documents as returned by the backend, fields passed through
    ///
    /// # Errors
    ///
    /// See [`total`](Self::total).
    pub fn hits(&mut self) -> Result<&[Map<String, Value>], CriteriaError> {
        self.ensure_parsed().map(|parsed| parsed.docs.as_slice())
    }

    /// Records fetched from the document store for the matched identifiers
    ///
    /// The search and the fetch each happen at most once per cache epoch.
    ///
    /// # Errors
    ///
    /// See [`total`](Self::total); a failing store is also `QueryFailed`.
    pub fn documents(&mut self) -> Result<&[R], CriteriaError> {
        let documents = match self.cache.documents.take() {
            Some(documents) => documents,
            None => self.load_documents()?,
        };
        Ok(self.cache.documents.insert(documents).as_slice())
    }

    /// Iterate over [`documents`](Self::documents)
    ///
    /// # Errors
    ///
    /// See [`documents`](Self::documents).
    pub fn iter(&mut self) -> Result<std::slice::Iter<'_, R>, CriteriaError> {
        self.documents().map(|documents| documents.iter())
    }

    /// Consume the criteria and return its records
    ///
    /// # Errors
    ///
    /// See [`documents`](Self::documents).
    pub fn into_documents(mut self) -> Result<Vec<R>, CriteriaError> {
        self.documents()?;
        Ok(self.cache.documents.take().unwrap_or_default())
    }

    fn effective_options(&self) -> QueryOptions {
        let mut options = self.query.options().clone();
        if options.rows.is_none() {
            options.rows = self.model.default_rows();
        }
        options
    }

    fn ensure_parsed(&mut self) -> Result<&ParsedResponse, CriteriaError> {
        let parsed = match self.cache.parsed.take() {
            Some(parsed) => parsed,
            None => self.load_parsed()?,
        };
        Ok(self.cache.parsed.insert(parsed))
    }

    fn load_parsed(&mut self) -> Result<ParsedResponse, CriteriaError> {
        if self.cache.response.is_none() {
            self.execute()?;
        }
        let parsed = match &self.cache.response {
            Some(raw) => response::parse(raw),
            None => Err("no response".to_string()),
        };
        parsed.map_err(|reason| self.fail(reason))
    }

    fn load_documents(&mut self) -> Result<Vec<R>, CriteriaError> {
        let ids = self.ensure_parsed()?.document_ids.clone();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.model.find_by_ids(&ids).map_err(|err| self.fail(err.to_string()))
    }

    /// Clear every cached result and build the error for `reason`
    fn fail(&mut self, reason: String) -> CriteriaError {
        log::warn!(
            "Search on {} failed for selector {}: {}",
            self.model.collection(),
            self.query.selector(),
            reason
        );
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_failure(self.model.collection());
        self.invalidate();
        CriteriaError::QueryFailed(reason)
    }
}

impl<R> From<&Criteria<R>> for ScopeBuilder {
    /// Only the selector and options are kept, never a second default scope.
    fn from(criteria: &Criteria<R>) -> Self {
        ScopeBuilder::Fixed(criteria.query.clone())
    }
}

impl<R> From<Criteria<R>> for ScopeBuilder {
    fn from(criteria: Criteria<R>) -> Self {
        ScopeBuilder::Fixed(criteria.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::test_helpers::{response_with_ids, MemoryStore, MockBackend};
    use crate::query::SortDirection;
    use serde_json::json;
    use std::sync::Arc;

    fn fixture() -> (Arc<MockBackend>, Arc<MemoryStore<String>>, Searchable<String>) {
        let backend = Arc::new(MockBackend::returning_ids(&["1", "2"]));
        let store = Arc::new(MemoryStore::from_records([
            ("1", "Pants".to_string()),
            ("2", "Shirt".to_string()),
        ]));
        let model = Searchable::new("products", backend.clone(), store.clone());
        (backend, store, model)
    }

    #[test]
    fn test_execute_with_empty_selector_does_not_call_backend() {
        let (backend, _, model) = fixture();
        let mut criteria = model.criteria();
        let err = criteria.execute().unwrap_err();
        assert!(err.is_empty_selector());
        assert_eq!(backend.call_count(), 0, "backend must not be called");
    }

    #[test]
    fn test_total_on_empty_selector_fails() {
        let (backend, _, model) = fixture();
        assert!(model.criteria().limit(3).total().unwrap_err().is_empty_selector());
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_documents_twice_hits_backend_once() {
        let (backend, store, model) = fixture();
        let mut criteria = model.filter(("tags", "x"));
        assert_eq!(criteria.documents().unwrap(), ["Pants", "Shirt"]);
        assert!(criteria.is_cached());
        assert_eq!(criteria.documents().unwrap(), ["Pants", "Shirt"]);
        assert_eq!(criteria.total().unwrap(), 2);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_total_then_ids_share_one_search() {
        let (backend, store, model) = fixture();
        let mut criteria = model.filter(("tags", "x"));
        assert_eq!(criteria.total().unwrap(), 2);
        assert_eq!(criteria.document_ids().unwrap(), ["1", "2"]);
        assert!(!criteria.is_cached(), "ids alone do not materialise records");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_every_mutation_invalidates_cache() {
        let (backend, _, model) = fixture();
        let mutations: Vec<fn(Criteria<String>) -> Criteria<String>> = vec![
            |c: Criteria<String>| c.filter(("a", 1)),
            |c: Criteria<String>| c.or([("b", 1), ("c", 2)]),
            |c: Criteria<String>| c.between(("d", 1..=2)),
            |c: Criteria<String>| c.lte(("e", 1)),
            |c: Criteria<String>| c.gte(("f", 1)),
            |c: Criteria<String>| c.lt(("g", 1)),
            |c: Criteria<String>| c.gt(("h", 1)),
            |c: Criteria<String>| c.sort(("i", SortDirection::Desc)),
            |c: Criteria<String>| c.limit(3),
            |c: Criteria<String>| c.skip(3),
            |c: Criteria<String>| c.merge(&SearchQuery::new().filter(("j", 1))),
        ];

        let mut criteria = model.filter(("tags", "x"));
        criteria.documents().unwrap();
        let mut expected_calls = 1;
        for mutate in mutations {
            criteria = mutate(criteria);
            assert!(!criteria.is_cached());
            assert!(criteria.response().is_none());
            criteria.documents().unwrap();
            expected_calls += 1;
            assert_eq!(backend.call_count(), expected_calls);
        }
    }

    #[test]
    fn test_execute_always_reexecutes() {
        let (backend, _, model) = fixture();
        let mut criteria = model.filter(("a", 1));
        criteria.total().unwrap();
        criteria.execute().unwrap();
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn test_backend_error_becomes_query_failed_and_clears_cache() {
        let (backend, _, model) = fixture();
        backend.push_response(Err(BackendError::Transport("timeout".into())));
        let mut criteria = model.filter(("a", 1));
        let err = criteria.documents().unwrap_err();
        assert!(err.is_query_failed());
        assert!(criteria.response().is_none());
        assert!(!criteria.is_cached());

        // The instance stays usable; the default response answers the retry
        assert_eq!(criteria.document_ids().unwrap(), ["1", "2"]);
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn test_malformed_response_is_query_failed() {
        let (backend, _, model) = fixture();
        backend.push_response(Ok(json!({ "unexpected": true })));
        let mut criteria = model.filter(("a", 1));
        assert!(criteria.total().unwrap_err().is_query_failed());
        assert!(criteria.response().is_none(), "half-populated cache left behind");
    }

    #[test]
    fn test_store_failure_is_query_failed() {
        let (_, store, model) = fixture();
        store.fail_next("disk gone");
        let mut criteria = model.filter(("a", 1));
        assert!(criteria.documents().unwrap_err().is_query_failed());
        assert!(!criteria.is_cached());
        assert_eq!(criteria.documents().unwrap().len(), 2);
    }

    #[test]
    fn test_no_matches_skips_store() {
        let (backend, store, model) = fixture();
        backend.push_response(Ok(response_with_ids(&[])));
        let mut criteria = model.filter(("a", 1));
        assert!(criteria.documents().unwrap().is_empty());
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_iter_and_into_documents() {
        let (_, _, model) = fixture();
        let mut criteria = model.filter(("a", 1));
        let names: Vec<&String> = criteria.iter().unwrap().collect();
        assert_eq!(names, ["Pants", "Shirt"]);
        assert_eq!(criteria.into_documents().unwrap(), vec!["Pants", "Shirt"]);
    }

    #[test]
    fn test_hits_pass_through_fields() {
        let (backend, _, model) = fixture();
        backend.push_response(Ok(json!({
            "response": { "numFound": 1, "docs": [{ "id": "1", "score": 0.5 }] }
        })));
        let mut criteria = model.filter(("a", 1));
        assert_eq!(criteria.hits().unwrap()[0].get("score"), Some(&json!(0.5)));
    }

    #[test]
    fn test_merge_criteria_and_scope_builder_conversion() {
        let (_, _, model) = fixture();
        let other = model.filter(("active", true)).limit(2);
        let criteria = model.criteria().merge_criteria(&other);
        assert_eq!(criteria.selector(), "((active:true))");
        assert_eq!(criteria.options().rows, Some(2));

        match ScopeBuilder::from(&other) {
            ScopeBuilder::Fixed(query) => assert_eq!(query.selector(), "(active:true)"),
            ScopeBuilder::Dynamic(_) => panic!("criteria converts to a fixed scope"),
        }
    }

    #[test]
    fn test_unknown_operation() {
        let (_, _, model) = fixture();
        let mut ctx = ScopeContext::new();
        let err = model.filter(("a", 1)).call(&mut ctx, "nope", &[]).unwrap_err();
        assert_eq!(err, CriteriaError::UnknownOperation("nope".into()));
    }
}
