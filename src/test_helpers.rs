//! In-memory collaborators for tests and examples.
//!
//! [`MockBackend`] answers searches from a queue of canned responses and
//! records every call; [`MemoryStore`] serves records from a map and counts
//! fetches. Both are cheap to share behind an `Arc` so tests can keep a handle
//! and assert round-trip counts after driving a [`Searchable`](crate::Searchable).

use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{BackendError, DocumentStore, SearchBackend};
use crate::query::QueryOptions;

/// Backend response listing `ids` in order, `numFound` equal to their count
pub fn response_with_ids(ids: &[&str]) -> Value {
    let docs: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "response": { "numFound": ids.len(), "docs": docs } })
}

/// One recorded [`SearchBackend::search`] call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub collection: String,
    pub query: String,
    pub options: QueryOptions,
}

struct MockState {
    queued: VecDeque<Result<Value, BackendError>>,
    default_response: Value,
    calls: Vec<SearchCall>,
    indexed: Vec<(String, Map<String, Value>)>,
}

/// Scripted search backend
///
/// Queued responses are returned first, in order; afterwards every search gets
/// the default response.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend answering every search with no matches
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                queued: VecDeque::new(),
                default_response: response_with_ids(&[]),
                calls: Vec::new(),
                indexed: Vec::new(),
            }),
        }
    }

    /// Backend answering every search with `ids`
    pub fn returning_ids(ids: &[&str]) -> Self {
        let backend = Self::new();
        backend.set_default_response(response_with_ids(ids));
        backend
    }

    /// Answer the next unanswered search with `response`
    pub fn push_response(&self, response: Result<Value, BackendError>) {
        self.state().queued.push_back(response);
    }

    pub fn set_default_response(&self, response: Value) {
        self.state().default_response = response;
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn last_call(&self) -> Option<SearchCall> {
        self.state().calls.last().cloned()
    }

    /// Documents received through [`SearchBackend::index`], with their collection
    pub fn indexed(&self) -> Vec<(String, Map<String, Value>)> {
        self.state().indexed.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SearchBackend for MockBackend {
    fn search(
        &self,
        collection: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Value, BackendError> {
        let mut state = self.state();
        state.calls.push(SearchCall {
            collection: collection.to_string(),
            query: query.to_string(),
            options: options.clone(),
        });
        match state.queued.pop_front() {
            Some(response) => response,
            None => Ok(state.default_response.clone()),
        }
    }

    fn index(&self, collection: &str, document: Map<String, Value>) -> Result<(), BackendError> {
        self.state().indexed.push((collection.to_string(), document));
        Ok(())
    }
}

struct StoreState<R> {
    records: HashMap<String, R>,
    fetches: Vec<Vec<String>>,
    fail_next: Option<String>,
}

/// Document store over an in-memory map
///
/// Unknown identifiers are skipped; the remaining records keep the order of
/// the requested identifiers.
pub struct MemoryStore<R> {
    state: Mutex<StoreState<R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                records: HashMap::new(),
                fetches: Vec::new(),
                fail_next: None,
            }),
        }
    }

    pub fn from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (id, record) in records {
            store.insert(id, record);
        }
        store
    }

    pub fn insert(&self, id: impl Into<String>, record: R) {
        self.state().records.insert(id.into(), record);
    }

    /// Number of `find_by_ids` calls so far
    pub fn fetch_count(&self) -> usize {
        self.state().fetches.len()
    }

    /// Identifiers requested by each `find_by_ids` call
    pub fn fetches(&self) -> Vec<Vec<String>> {
        self.state().fetches.clone()
    }

    /// Make the next `find_by_ids` call fail with `message`
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    fn state(&self) -> MutexGuard<'_, StoreState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Clone + Send> DocumentStore<R> for MemoryStore<R> {
    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<R>, BackendError> {
        let mut state = self.state();
        state.fetches.push(ids.to_vec());
        if let Some(message) = state.fail_next.take() {
            return Err(BackendError::Store(message));
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_queue_then_default() {
        let backend = MockBackend::returning_ids(&["a"]);
        backend.push_response(Err(BackendError::Transport("down".into())));
        let options = QueryOptions::default();

        assert!(backend.search("c", "(x:1)", &options).is_err());
        let raw = backend.search("c", "(x:1)", &options).unwrap();
        assert_eq!(raw["response"]["docs"][0]["id"], "a");
        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.last_call().map(|c| c.query), Some("(x:1)".to_string()));
    }

    #[test]
    fn test_memory_store_keeps_requested_order() {
        let store = MemoryStore::from_records([("1", 'a'), ("2", 'b'), ("3", 'c')]);
        let ids = vec!["3".to_string(), "missing".to_string(), "1".to_string()];
        assert_eq!(store.find_by_ids(&ids).unwrap(), vec!['c', 'a']);

        store.fail_next("gone");
        assert_eq!(
            store.find_by_ids(&ids).unwrap_err(),
            BackendError::Store("gone".to_string())
        );
        assert_eq!(store.fetch_count(), 2);
        assert_eq!(store.fetches()[0], ids);
    }
}
