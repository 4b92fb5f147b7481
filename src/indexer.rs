//! Push saved records into the search index.
//!
//! The criteria layer only finds what was indexed. [`SearchIndexer`] is the
//! save hook: after a record is persisted, its non-null attributes plus its
//! identifier are sent to the backend under the model's collection.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::backend::{BackendError, SearchBackend};
use crate::model::Searchable;

/// Record that can be pushed into a search collection
pub trait SearchDocument: Serialize {
    /// Identifier stored in the index `id` field
    fn document_id(&self) -> String;
}

/// Indexes records of one collection after they are saved
#[derive(Clone)]
pub struct SearchIndexer {
    collection: String,
    backend: Arc<dyn SearchBackend>,
}

impl std::fmt::Debug for SearchIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndexer")
            .field("collection", &self.collection)
            .finish()
    }
}

impl SearchIndexer {
    pub fn new(collection: impl Into<String>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            collection: collection.into(),
            backend,
        }
    }

    /// Indexer writing to the collection and backend `model` searches
    pub fn for_model<R>(model: &Searchable<R>) -> Self {
        Self::new(model.collection(), Arc::clone(model.backend()))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Index `record` after it was saved
    ///
    /// # Errors
    ///
    /// `BackendError::Other` when the record does not serialise to an object,
    /// or whatever the backend reports.
    pub fn after_save<D: SearchDocument>(&self, record: &D) -> Result<(), BackendError> {
        let document = index_document(record)?;
        log::debug!(
            "Indexing {} into {}",
            record.document_id(),
            self.collection
        );
        self.backend.index(&self.collection, document)
    }
}

/// The attributes of `record` sent to the index: nulls dropped, `id` set
///
/// # Errors
///
/// `BackendError::Other` when `record` does not serialise to a JSON object.
pub fn index_document<D: SearchDocument>(record: &D) -> Result<Map<String, Value>, BackendError> {
    let attributes = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(BackendError::Other(format!(
                "record {} serialised to {}, expected an object",
                record.document_id(),
                other
            )))
        }
    };
    let mut document: Map<String, Value> = attributes
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    document.insert("id".to_string(), Value::String(record.document_id()));
    Ok(document)
}
