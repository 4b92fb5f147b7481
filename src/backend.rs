//! Search backend and document store collaborators.
//!
//! The criteria layer never talks to a transport directly. It issues one
//! [`SearchBackend::search`] call per cache epoch and, when documents are
//! enumerated, one [`DocumentStore::find_by_ids`] call. Both traits are object
//! safe so a [`Searchable`](crate::Searchable) can hold them behind `Arc<dyn _>`.

use serde_json::{Map, Value};
use std::fmt;

use crate::query::QueryOptions;

/// Error reported by a backend or document store implementation.
///
/// These never cross the criteria boundary: [`Criteria`](crate::Criteria)
/// converts every `BackendError` into
/// [`CriteriaError::QueryFailed`](crate::CriteriaError::QueryFailed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection, timeout or protocol failure
    Transport(String),
    /// The backend answered with an error payload
    Response(String),
    /// Record lookup in the document store failed
    Store(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(s) => write!(f, "Transport error: {s}"),
            BackendError::Response(s) => write!(f, "Backend error: {s}"),
            BackendError::Store(s) => write!(f, "Document store error: {s}"),
            BackendError::Other(s) => write!(f, "Search error: {s}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Other(err.to_string())
    }
}

/// Trait for issuing queries against a full-text search backend
///
/// The backend receives the accumulated selector in Lucene-style syntax and the
/// criteria options (`sort`, `rows`, `start`). It must answer with a JSON value
/// shaped like:
///
/// ```text
/// { "response": { "numFound": 2, "docs": [ { "id": "a", ... }, { "id": "b", ... } ] } }
/// ```
///
/// Anything else is treated as a failed query by the criteria.
///
/// # Examples
///
/// ```
/// use lifeguard_search::{BackendError, QueryOptions, SearchBackend};
/// use serde_json::{json, Map, Value};
///
/// struct Empty;
///
/// impl SearchBackend for Empty {
///     fn search(&self, _c: &str, _q: &str, _o: &QueryOptions) -> Result<Value, BackendError> {
///         Ok(json!({ "response": { "numFound": 0, "docs": [] } }))
///     }
///
///     fn index(&self, _c: &str, _d: Map<String, Value>) -> Result<(), BackendError> {
///         Ok(())
///     }
/// }
/// ```
pub trait SearchBackend: Send + Sync {
    /// Run `query` against `collection` and return the raw response
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the transport or the backend fails.
    fn search(
        &self,
        collection: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value, BackendError>;

    /// Push one document into the index of `collection`
    ///
    /// Used by [`SearchIndexer`](crate::SearchIndexer) after a record is saved.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the document could not be indexed.
    fn index(&self, collection: &str, document: Map<String, Value>) -> Result<(), BackendError>;
}

/// Persistence collaborator that materialises records by identifier
pub trait DocumentStore<R>: Send + Sync {
    /// Fetch the records for `ids`, preserving the order of `ids`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the lookup fails.
    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<R>, BackendError>;
}
