//! Searchable model handle.
//!
//! A [`Searchable`] plays the role of the model class: it knows the index
//! collection, the backend and document store, and owns the scope registry
//! (named scopes, default scope and finders). Handles are cheap to clone and
//! share one registry.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::backend::{BackendError, DocumentStore, SearchBackend};
use crate::config::SearchConfig;
use crate::criteria::{Criteria, CriteriaError};
use crate::query::{Clause, IntoPredicates, QueryOptions, SearchQuery, SearchValue, SortSpec};
use crate::scope::{registry, Extension, ScopeBuilder, ScopeContext, ScopeDefinition, ScopeRegistry};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

struct ModelInner<R> {
    collection: String,
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn DocumentStore<R>>,
    default_rows: Option<u64>,
    registry: RwLock<ScopeRegistry<R>>,
}

/// Model class backed by a search collection
pub struct Searchable<R> {
    inner: Arc<ModelInner<R>>,
}

impl<R> Clone for Searchable<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for Searchable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        f.debug_struct("Searchable")
            .field("collection", &self.inner.collection)
            .field("default_rows", &self.inner.default_rows)
            .field("scopes", &registry.scope_names())
            .field("default_scope", &registry.has_default_scope())
            .finish()
    }
}

impl<R> Searchable<R> {
    /// Model searching `collection` through `backend`, loading records from `store`
    pub fn new(
        collection: impl Into<String>,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn DocumentStore<R>>,
    ) -> Self {
        Self::build(collection.into(), backend, store, None)
    }

    /// Like [`new`](Self::new), with the collection prefix and default page
    /// size taken from `config`
    pub fn with_config(
        name: &str,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn DocumentStore<R>>,
        config: &SearchConfig,
    ) -> Self {
        Self::build(config.collection_name(name), backend, store, config.default_rows)
    }

    fn build(
        collection: String,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn DocumentStore<R>>,
        default_rows: Option<u64>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                collection,
                backend,
                store,
                default_rows,
                registry: RwLock::new(ScopeRegistry::new()),
            }),
        }
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.inner.backend
    }

    /// Page size used when a criteria sets no `rows`
    pub fn default_rows(&self) -> Option<u64> {
        self.inner.default_rows
    }

    /// Whether [`call`](Self::call) can dispatch `name`
    pub fn responds_to(&self, name: &str) -> bool {
        self.registry().responds_to(name)
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.registry()
            .scope_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn has_default_scope(&self) -> bool {
        self.registry().has_default_scope()
    }

    /// The composed default scope, `None` when none is registered
    pub fn default_query(&self) -> Option<SearchQuery> {
        let parts = self.registry().default_parts();
        registry::compose_parts(&parts)
    }

    /// Run one backend search against this model's collection
    ///
    /// # Errors
    ///
    /// Whatever the backend reports.
    pub fn search(&self, selector: &str, options: &QueryOptions) -> Result<Value, BackendError> {
        log::debug!(
            "Searching {} for {} with {:?}",
            self.inner.collection,
            selector,
            options
        );
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::search_span(&self.inner.collection, selector).entered();
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let result = self
            .inner
            .backend
            .search(&self.inner.collection, selector, options);

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_search(
            &self.inner.collection,
            started.elapsed(),
            result.is_ok(),
        );
        result
    }

    /// Load records for `ids` from the document store, in `ids` order
    ///
    /// # Errors
    ///
    /// Whatever the store reports.
    pub fn find_by_ids(&self, ids: &[String]) -> Result<Vec<R>, BackendError> {
        log::debug!("Fetching {} {} records", ids.len(), self.inner.collection);
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::fetch_span(&self.inner.collection, ids.len()).entered();

        let records = self.inner.store.find_by_ids(ids)?;

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_fetch(&self.inner.collection, records.len());
        Ok(records)
    }

    fn registry(&self) -> RwLockReadGuard<'_, ScopeRegistry<R>> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, ScopeRegistry<R>> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: 'static> Searchable<R> {
    /// Fresh criteria with the default scope applied
    pub fn criteria(&self) -> Criteria<R> {
        self.with_default_scope(&ScopeContext::new())
    }

    /// Criteria for the chain running in `ctx`
    ///
    /// Continues the enclosing criteria when one is on the scope stack.
    pub fn criteria_in(&self, ctx: &ScopeContext) -> Criteria<R> {
        self.with_default_scope(ctx)
    }

    /// Criteria with no restrictions and no default scope
    pub fn empty_criteria(&self) -> Criteria<R> {
        Criteria::new(self.clone())
    }

    /// Base criteria for the chain running in `ctx`
    ///
    /// Inside a chain this is a fork of the top of the scope stack, which
    /// already carries whatever default scope applied when the chain started.
    /// Otherwise the default scope is applied unless `ctx` suppresses it.
    pub fn with_default_scope(&self, ctx: &ScopeContext) -> Criteria<R> {
        if let Some(top) = ctx.top::<R>(&self.inner.collection) {
            return top.fork();
        }
        if !ctx.is_default_scope_suppressed(&self.inner.collection) {
            if let Some(query) = self.default_query() {
                return Criteria::with_query(self.clone(), query);
            }
        }
        self.empty_criteria()
    }

    /// Suppress the default scope for the rest of the chain running in `ctx`
    ///
    /// Returns the enclosing criteria when inside a chain, else an empty one.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use lifeguard_search::{ScopeContext, SearchQuery, Searchable};
    /// # use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
    /// # let people: Searchable<String> =
    /// #     Searchable::new("people", Arc::new(MockBackend::new()), Arc::new(MemoryStore::new()));
    /// people.default_scope(SearchQuery::new().filter(("active", true)));
    ///
    /// let mut ctx = ScopeContext::new();
    /// let all = people.without_default_scope(&mut ctx).filter(("age", 3));
    /// assert_eq!(all.selector(), "(age:3)");
    /// assert_eq!(people.criteria_in(&ctx).selector(), "");
    /// ```
    pub fn without_default_scope(&self, ctx: &mut ScopeContext) -> Criteria<R> {
        ctx.suppress_default_scope(&self.inner.collection);
        match ctx.top::<R>(&self.inner.collection) {
            Some(top) => top.fork(),
            None => self.empty_criteria(),
        }
    }

    pub fn filter(&self, clause: impl Into<Clause>) -> Criteria<R> {
        self.criteria().filter(clause)
    }

    pub fn or(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().or(predicates)
    }

    pub fn any_of(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().any_of(predicates)
    }

    pub fn between(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().between(predicates)
    }

    pub fn lte(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().lte(predicates)
    }

    pub fn gte(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().gte(predicates)
    }

    pub fn lt(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().lt(predicates)
    }

    pub fn gt(&self, predicates: impl IntoPredicates) -> Criteria<R> {
        self.criteria().gt(predicates)
    }

    pub fn sort(&self, spec: impl Into<SortSpec>) -> Criteria<R> {
        self.criteria().sort(spec)
    }

    pub fn limit(&self, rows: u64) -> Criteria<R> {
        self.criteria().limit(rows)
    }

    pub fn skip(&self, start: u64) -> Criteria<R> {
        self.criteria().skip(start)
    }

    /// Register a named scope reachable through [`call`](Self::call)
    ///
    /// Criteria produced by the scope carry `extension`. Registering over a
    /// builtin operation, scope or finder logs a warning and replaces it.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use lifeguard_search::{Extension, ScopeBuilder, ScopeContext, SearchQuery, SearchValue, Searchable};
    /// # use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
    /// # let products: Searchable<String> =
    /// #     Searchable::new("products", Arc::new(MockBackend::new()), Arc::new(MemoryStore::new()));
    /// products.define_scope(
    ///     "in_stock",
    ///     ScopeBuilder::dynamic(|args| {
    ///         let min = args.first().cloned().unwrap_or(SearchValue::Int(1));
    ///         SearchQuery::new().gte(("quantity", min))
    ///     }),
    ///     Extension::new().with("cheapest", |criteria, _| Ok(criteria.sort("price asc"))),
    /// );
    ///
    /// let mut ctx = ScopeContext::new();
    /// let criteria = products
    ///     .call(&mut ctx, "in_stock", &[SearchValue::Int(5)])?
    ///     .call(&mut ctx, "cheapest", &[])?;
    /// assert_eq!(criteria.selector(), "(((quantity:[5 TO 100000000000000000000])))");
    /// assert_eq!(criteria.options().sort.as_deref(), Some("price asc"));
    /// # Ok::<(), lifeguard_search::CriteriaError>(())
    /// ```
    pub fn define_scope(
        &self,
        name: &str,
        builder: impl Into<ScopeBuilder>,
        extension: Extension<R>,
    ) {
        let definition = ScopeDefinition {
            name: name.to_string(),
            builder: builder.into(),
            extension,
        };
        let overwritten = self.registry_mut().insert_scope(definition);
        if overwritten {
            log::warn!(
                "Scope {} on {} overwrites an existing operation of the same name",
                name,
                self.inner.collection
            );
        }
    }

    /// AND `value` onto the default scope
    ///
    /// Registering a value equal to the current default scope does nothing.
    pub fn default_scope(&self, value: impl Into<ScopeBuilder>) {
        let value = value.into();
        // Builders may read this model, so they resolve with no lock held
        let parts = self.registry().default_parts();
        if registry::is_same_default(&parts, &value) {
            log::debug!(
                "Default scope of {} unchanged, same value registered again",
                self.inner.collection
            );
            return;
        }
        self.registry_mut().push_default(value);
    }

    /// Register a class-level finder reachable through [`call`](Self::call)
    pub fn define_finder<F>(&self, name: &str, finder: F)
    where
        F: Fn(&Searchable<R>, &mut ScopeContext, &[SearchValue]) -> Result<Criteria<R>, CriteriaError>
            + Send
            + Sync
            + 'static,
    {
        if self.registry_mut().insert_finder(name, Arc::new(finder)) {
            log::warn!(
                "Finder {} on {} overwrites an existing operation of the same name",
                name,
                self.inner.collection
            );
        }
    }

    /// Build the criteria of scope `name` for the chain running in `ctx`
    ///
    /// The base is [`with_default_scope`](Self::with_default_scope); the
    /// scope's query is merged onto it and its extension attached.
    ///
    /// # Errors
    ///
    /// `CriteriaError::UnknownOperation` when no scope is named `name`.
    pub fn apply_scope(
        &self,
        ctx: &ScopeContext,
        name: &str,
        args: &[SearchValue],
    ) -> Result<Criteria<R>, CriteriaError> {
        let definition = self
            .registry()
            .scope(name)
            .cloned()
            .ok_or_else(|| CriteriaError::UnknownOperation(name.to_string()))?;
        let query = definition.builder.resolve(args);
        Ok(self
            .with_default_scope(ctx)
            .merge(&query)
            .with_extension(&definition.extension))
    }

    /// Dispatch `name` to a scope, then to a finder
    ///
    /// # Errors
    ///
    /// `CriteriaError::UnknownOperation` when neither table knows `name`, or
    /// whatever the finder returns.
    pub fn call(
        &self,
        ctx: &mut ScopeContext,
        name: &str,
        args: &[SearchValue],
    ) -> Result<Criteria<R>, CriteriaError> {
        let is_scope = self.registry().scope(name).is_some();
        if is_scope {
            return self.apply_scope(ctx, name, args);
        }
        let finder = self.registry().finder(name);
        match finder {
            Some(finder) => finder(self, ctx, args),
            None => Err(CriteriaError::UnknownOperation(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryStore, MockBackend};

    fn people() -> (Arc<MockBackend>, Searchable<String>) {
        let backend = Arc::new(MockBackend::returning_ids(&["1"]));
        let store = Arc::new(MemoryStore::from_records([("1", "Joe".to_string())]));
        (backend.clone(), Searchable::new("people", backend, store))
    }

    #[test]
    fn test_class_level_operations_start_fresh() {
        let (_, model) = people();
        assert_eq!(model.filter(("a", 1)).selector(), "(a:1)");
        assert_eq!(model.filter(("b", 2)).selector(), "(b:2)");
        assert_eq!(model.limit(3).options().rows, Some(3));
        assert_eq!(model.skip(4).options().start, Some(4));
    }

    #[test]
    fn test_default_scope_applies_to_fresh_criteria() {
        let (_, model) = people();
        model.default_scope(SearchQuery::new().filter(("active", true)));
        assert_eq!(model.criteria().selector(), "((active:true))");
        assert_eq!(
            model.filter(("name", "Joe")).selector(),
            "((active:true)) AND (name:Joe)"
        );
        assert!(model.empty_criteria().query().is_blank());
    }

    #[test]
    fn test_default_scope_composition() {
        let (_, model) = people();
        let active = SearchQuery::new().filter(("active", true));
        model.default_scope(active.clone());
        model.default_scope(active);
        model.default_scope(SearchQuery::new().filter(("age", 3)));
        assert_eq!(
            model.criteria().selector(),
            "((active:true)) AND ((age:3))",
            "A twice is a no-op, then B composes to A AND B"
        );
    }

    #[test]
    fn test_suppression_is_per_context() {
        let (_, model) = people();
        model.default_scope(SearchQuery::new().filter(("active", true)));

        let mut suppressed = ScopeContext::new();
        assert_eq!(model.without_default_scope(&mut suppressed).selector(), "");
        assert_eq!(model.criteria_in(&suppressed).selector(), "");

        let other = ScopeContext::new();
        assert_eq!(model.criteria_in(&other).selector(), "((active:true))");
    }

    #[test]
    fn test_without_default_scope_inside_chain_returns_enclosing() {
        let (_, model) = people();
        model.default_scope(SearchQuery::new().filter(("active", true)));
        let mut ctx = ScopeContext::new();
        let selector = ctx.with_scope(model.filter(("name", "Joe")), |scope| {
            model.without_default_scope(scope).selector().to_string()
        });
        assert_eq!(selector, "((active:true)) AND (name:Joe)");
        assert!(ctx.is_default_scope_suppressed("people"));
    }

    #[test]
    fn test_scope_from_criteria_skips_second_default() {
        let (_, model) = people();
        model.default_scope(SearchQuery::new().filter(("active", true)));
        model.define_scope("joes", &model.empty_criteria().filter(("name", "Joe")), Extension::new());

        let ctx = ScopeContext::new();
        let criteria = model.apply_scope(&ctx, "joes", &[]).unwrap();
        assert_eq!(criteria.selector(), "((active:true)) AND ((name:Joe))");
    }

    #[test]
    fn test_scope_overwrite_still_succeeds() {
        let (_, model) = people();
        model.define_scope("named", SearchQuery::new().filter(("a", 1)), Extension::new());
        model.define_scope("named", SearchQuery::new().filter(("b", 2)), Extension::new());
        model.define_scope("sort", SearchQuery::new().filter(("c", 3)), Extension::new());

        let ctx = ScopeContext::new();
        assert_eq!(model.apply_scope(&ctx, "named", &[]).unwrap().selector(), "((b:2))");
        assert_eq!(model.scope_names(), vec!["named", "sort"]);
    }

    #[test]
    fn test_finder_replaces_scope_of_same_name() {
        let (_, model) = people();
        model.define_scope("by_name", SearchQuery::new().filter(("a", 1)), Extension::new());
        model.define_finder("by_name", |model, ctx, args| {
            let name = args.first().cloned().unwrap_or(SearchValue::Wildcard);
            Ok(model.criteria_in(ctx).filter(("name", name)))
        });

        let mut ctx = ScopeContext::new();
        let criteria = model.call(&mut ctx, "by_name", &[SearchValue::from("Joe")]).unwrap();
        assert_eq!(criteria.selector(), "(name:Joe)");
        assert!(model.scope_names().is_empty());
    }

    #[test]
    fn test_call_unknown() {
        let (_, model) = people();
        let mut ctx = ScopeContext::new();
        let err = model.call(&mut ctx, "missing", &[]).unwrap_err();
        assert!(err.is_unknown_operation());
        assert!(!model.responds_to("missing"));
    }

    #[test]
    fn test_with_config_prefixes_collection_and_sets_rows() {
        let backend = Arc::new(MockBackend::returning_ids(&[]));
        let config = SearchConfig {
            collection_prefix: "staging_".to_string(),
            default_rows: Some(25),
        };
        let model: Searchable<String> = Searchable::with_config(
            "people",
            backend.clone(),
            Arc::new(MemoryStore::new()),
            &config,
        );
        assert_eq!(model.collection(), "staging_people");

        model.filter(("a", 1)).total().unwrap();
        let call = backend.last_call().expect("one search");
        assert_eq!(call.collection, "staging_people");
        assert_eq!(call.options.rows, Some(25));

        model.filter(("a", 1)).limit(5).total().unwrap();
        assert_eq!(backend.last_call().map(|c| c.options.rows), Some(Some(5)));
    }

    #[test]
    fn test_dynamic_default_scope_may_read_its_model() {
        let (_, model) = people();
        model.default_scope(SearchQuery::new().filter(("tenant", 7)));

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = model.clone();
        std::thread::spawn(move || {
            let handle = worker.clone();
            worker.default_scope(ScopeBuilder::dynamic(move |_| {
                let scoped = handle.has_default_scope();
                let named = handle.scope_names().len();
                SearchQuery::new().filter(("scoped", scoped)).limit(named as u64 + 1)
            }));
            let selector = worker.criteria().selector().to_string();
            let _ = tx.send(selector);
        });

        let selector = rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("default scope registration and resolution return");
        assert_eq!(selector, "((tenant:7)) AND ((scoped:true))");
        assert_eq!(model.default_query().map(|q| q.options().rows), Some(Some(1)));
    }
}
