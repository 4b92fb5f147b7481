//! # Lifeguard Search
//!
//! Chainable search criteria for Lifeguard models indexed in a Lucene-style
//! search backend.
//!
//! - [`Criteria`] accumulates restrictions (`filter`, `or`, `between`, `lte`,
//!   ...) and options (`sort`, `limit`, `skip`) and only runs the search when
//!   a result is observed. Results are cached until the next mutation.
//! - [`Searchable`] is the model handle: collection, backend, document store,
//!   named scopes, the default scope and class-level finders.
//! - [`ScopeContext`] carries the scope stack and default-scope suppression of
//!   one call chain, so independent chains never see each other's state.
//!
//! ```
//! use std::sync::Arc;
//! use lifeguard_search::{ScopeContext, SearchQuery, Searchable};
//! use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
//!
//! let backend = Arc::new(MockBackend::returning_ids(&["7"]));
//! let store = Arc::new(MemoryStore::from_records([("7", "Pants".to_string())]));
//! let products: Searchable<String> = Searchable::new("products", backend.clone(), store);
//! products.default_scope(SearchQuery::new().filter(("active", true)));
//!
//! let mut criteria = products.filter(("tags", "x")).limit(5);
//! assert_eq!(criteria.selector(), "((active:true)) AND (tags:x)");
//! assert_eq!(criteria.documents()?, ["Pants"]);
//!
//! let mut ctx = ScopeContext::new();
//! let unscoped = products.without_default_scope(&mut ctx).filter(("tags", "x"));
//! assert_eq!(unscoped.selector(), "(tags:x)");
//! # Ok::<(), lifeguard_search::CriteriaError>(())
//! ```

pub mod backend;
pub mod config;
pub mod criteria;
pub mod indexer;
mod macros;
#[cfg(any(feature = "metrics", feature = "tracing"))]
pub mod metrics;
pub mod model;
pub mod query;
pub mod scope;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use backend::{BackendError, DocumentStore, SearchBackend};
pub use config::SearchConfig;
pub use criteria::{Criteria, CriteriaError};
pub use indexer::{SearchDocument, SearchIndexer};
pub use model::Searchable;
pub use query::{
    Clause, IntoPredicates, Predicate, QueryOptions, SearchQuery, SearchValue, SortDirection,
    SortSpec,
};
pub use scope::{Extension, Finder, ScopeBuilder, ScopeContext, ScopeGuard};
