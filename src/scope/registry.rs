//! Named scopes, the default scope, and class-level finders of one model.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::criteria::{Criteria, CriteriaError};
use crate::model::Searchable;
use crate::query::{SearchQuery, SearchValue};

use super::stack::ScopeContext;

/// Operation attached to criteria produced by a scope
pub type ExtensionOp<R> =
    Arc<dyn Fn(Criteria<R>, &[SearchValue]) -> Result<Criteria<R>, CriteriaError> + Send + Sync>;

/// Class-level finder reachable through [`Searchable::call`]
///
/// The finder receives the model, the scope context of the calling chain and
/// the call arguments. Building on `model.criteria_in(ctx)` continues the
/// enclosing criteria when the finder is reached from [`Criteria::call`].
pub type Finder<R> = Arc<
    dyn Fn(&Searchable<R>, &mut ScopeContext, &[SearchValue]) -> Result<Criteria<R>, CriteriaError>
        + Send
        + Sync,
>;

type DynamicScope = Arc<dyn Fn(&[SearchValue]) -> SearchQuery + Send + Sync>;

/// Produces the selector a scope contributes
#[derive(Clone)]
pub enum ScopeBuilder {
    /// Same query on every call
    Fixed(SearchQuery),
    /// Query built from the call arguments
    Dynamic(DynamicScope),
}

impl ScopeBuilder {
    /// Scope whose query depends on its arguments
    ///
    /// ```
    /// use lifeguard_search::{ScopeBuilder, SearchQuery, SearchValue};
    ///
    /// let avail = ScopeBuilder::dynamic(|args| {
    ///     let count = args.first().cloned().unwrap_or(SearchValue::Int(1));
    ///     SearchQuery::new().filter(("quantity", count))
    /// });
    /// assert_eq!(avail.resolve(&[SearchValue::Int(3)]).selector(), "(quantity:3)");
    /// ```
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&[SearchValue]) -> SearchQuery + Send + Sync + 'static,
    {
        ScopeBuilder::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, args: &[SearchValue]) -> SearchQuery {
        match self {
            ScopeBuilder::Fixed(query) => query.clone(),
            ScopeBuilder::Dynamic(f) => f(args),
        }
    }
}

impl fmt::Debug for ScopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeBuilder::Fixed(query) => f.debug_tuple("Fixed").field(query).finish(),
            ScopeBuilder::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<SearchQuery> for ScopeBuilder {
    fn from(query: SearchQuery) -> Self {
        ScopeBuilder::Fixed(query)
    }
}

impl From<&SearchQuery> for ScopeBuilder {
    fn from(query: &SearchQuery) -> Self {
        ScopeBuilder::Fixed(query.clone())
    }
}

/// Named extra operations carried by a criteria
pub struct Extension<R> {
    ops: HashMap<String, ExtensionOp<R>>,
}

impl<R> Default for Extension<R> {
    fn default() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }
}

impl<R> Clone for Extension<R> {
    fn clone(&self) -> Self {
        Self {
            ops: self.ops.clone(),
        }
    }
}

impl<R> fmt::Debug for Extension<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl<R> Extension<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation named `name`
    pub fn with<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(Criteria<R>, &[SearchValue]) -> Result<Criteria<R>, CriteriaError>
            + Send
            + Sync
            + 'static,
    {
        self.ops.insert(name.into(), Arc::new(op));
        self
    }

    pub fn get(&self, name: &str) -> Option<ExtensionOp<R>> {
        self.ops.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operation names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Copy every operation of `other` into `self`; `other` wins on clashes
    pub fn extend(&mut self, other: &Extension<R>) {
        for (name, op) in &other.ops {
            self.ops.insert(name.clone(), Arc::clone(op));
        }
    }
}

/// One registered scope
pub struct ScopeDefinition<R> {
    pub name: String,
    pub builder: ScopeBuilder,
    pub extension: Extension<R>,
}

impl<R> Clone for ScopeDefinition<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            builder: self.builder.clone(),
            extension: self.extension.clone(),
        }
    }
}

/// Chainable operations every criteria already has; scopes and finders
/// registered under these names shadow nothing but are reported.
pub const BUILTIN_OPERATIONS: &[&str] = &[
    "filter",
    "or",
    "any_of",
    "between",
    "lte",
    "gte",
    "lt",
    "gt",
    "sort",
    "order_by",
    "order",
    "limit",
    "rows",
    "skip",
    "start",
    "merge",
    "execute",
    "total",
    "document_ids",
    "documents",
    "criteria",
    "search",
];

/// Scope table of one model
///
/// Holds the named scopes, the composed default scope and the finder
/// passthrough table consulted by the single dispatch entry point.
pub struct ScopeRegistry<R> {
    scopes: HashMap<String, ScopeDefinition<R>>,
    default_scope: Vec<ScopeBuilder>,
    finders: HashMap<String, Finder<R>>,
}

impl<R> Default for ScopeRegistry<R> {
    fn default() -> Self {
        Self {
            scopes: HashMap::new(),
            default_scope: Vec::new(),
            finders: HashMap::new(),
        }
    }
}

impl<R> ScopeRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is a builtin, a scope or a finder
    pub fn is_taken(&self, name: &str) -> bool {
        BUILTIN_OPERATIONS.contains(&name) || self.responds_to(name)
    }

    /// Whether dispatch by `name` reaches a scope or finder
    pub fn responds_to(&self, name: &str) -> bool {
        self.scopes.contains_key(name) || self.finders.contains_key(name)
    }

    /// Register a scope; returns `true` when an existing name was overwritten
    pub fn insert_scope(&mut self, definition: ScopeDefinition<R>) -> bool {
        let overwritten = self.is_taken(&definition.name);
        self.finders.remove(&definition.name);
        self.scopes.insert(definition.name.clone(), definition);
        overwritten
    }

    /// Register a finder; returns `true` when an existing name was overwritten
    pub fn insert_finder(&mut self, name: &str, finder: Finder<R>) -> bool {
        let overwritten = self.is_taken(name);
        self.scopes.remove(name);
        self.finders.insert(name.to_string(), finder);
        overwritten
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeDefinition<R>> {
        self.scopes.get(name)
    }

    pub fn finder(&self, name: &str) -> Option<Finder<R>> {
        self.finders.get(name).cloned()
    }

    /// Scope names, sorted
    pub fn scope_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// AND `value` onto the default scope
    ///
    /// A value whose query equals the current default scope is ignored.
    /// Returns `true` when the default scope changed.
    pub fn compose_default(&mut self, value: ScopeBuilder) -> bool {
        if is_same_default(&self.default_scope, &value) {
            return false;
        }
        self.push_default(value);
        true
    }

    /// Append `value` to the default scope without comparing
    pub fn push_default(&mut self, value: ScopeBuilder) {
        self.default_scope.push(value);
    }

    /// The builders making up the default scope, in registration order
    pub fn default_parts(&self) -> Vec<ScopeBuilder> {
        self.default_scope.clone()
    }

    pub fn has_default_scope(&self) -> bool {
        !self.default_scope.is_empty()
    }

    /// The composed default scope, `None` when none is registered
    pub fn default_query(&self) -> Option<SearchQuery> {
        compose_parts(&self.default_scope)
    }
}

/// Fold default-scope builders into one query, `None` when there are none
///
/// Builders may call back into their model, so callers holding the registry
/// behind a lock resolve a cloned [`ScopeRegistry::default_parts`] instead.
pub fn compose_parts(parts: &[ScopeBuilder]) -> Option<SearchQuery> {
    if parts.is_empty() {
        return None;
    }
    Some(
        parts
            .iter()
            .fold(SearchQuery::new(), |query, part| query.merge(&part.resolve(&[]))),
    )
}

/// Whether registering `value` on top of `parts` would leave the default scope as is
pub fn is_same_default(parts: &[ScopeBuilder], value: &ScopeBuilder) -> bool {
    match compose_parts(parts) {
        Some(current) => SearchQuery::new().merge(&value.resolve(&[])) == current,
        None => false,
    }
}
