//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentError, DocumentStore, Fields};

type Collection = BTreeMap<String, Fields>;

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    fail_remaining: usize,
}

/// Document store that keeps everything in memory.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
    queries: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query_where` calls so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `get_document` calls so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make the next `count` operations fail with a 503.
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_remaining = count;
    }

    /// Seed a document directly.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Read a document without going through the trait.
    #[must_use]
    pub fn snapshot(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(inner: &mut Inner) -> Result<(), DocumentError> {
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            return Err(DocumentError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, DocumentError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        Self::check_failure(&mut inner)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), DocumentError> {
        let mut inner = self.lock();
        Self::check_failure(&mut inner)?;
        let docs = inner.collections.entry(collection.to_string()).or_default();
        if merge && let Some(existing) = docs.get_mut(id) {
            existing.extend(fields);
            return Ok(());
        }
        docs.insert(id.to_string(), fields);
        Ok(())
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, DocumentError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        Self::check_failure(&mut inner)?;
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| fields.get(field) == Some(value))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_fields() {
        let store = InMemoryDocumentStore::new();
        store.insert("users", "u1", fields(json!({ "email": "a@b.co", "plan": "free" })));

        store
            .set_document("users", "u1", fields(json!({ "plan": "pro" })), true)
            .await
            .unwrap();

        let doc = store.get_document("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.str_field("email"), Some("a@b.co"));
        assert_eq!(doc.str_field("plan"), Some("pro"));
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces() {
        let store = InMemoryDocumentStore::new();
        store.insert("users", "u1", fields(json!({ "email": "a@b.co" })));

        store
            .set_document("users", "u1", fields(json!({ "plan": "pro" })), false)
            .await
            .unwrap();

        let doc = store.snapshot("users", "u1").unwrap();
        assert!(doc.get("email").is_none());
    }

    #[tokio::test]
    async fn test_query_where_matches_equal_values() {
        let store = InMemoryDocumentStore::new();
        store.insert("users", "u1", fields(json!({ "username": "ada" })));
        store.insert("users", "u2", fields(json!({ "username": "grace" })));

        let found = store
            .query_where("users", "username", &json!("ada"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().id, "u1");
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_counts_down() {
        let store = InMemoryDocumentStore::new();
        store.fail_next(1);

        assert!(store.get_document("users", "u1").await.is_err());
        assert!(store.get_document("users", "u1").await.unwrap().is_none());
        assert_eq!(store.read_count(), 2);
    }
}
