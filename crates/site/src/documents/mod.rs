//! Document store adapter.
//!
//! Schemaless documents grouped in collections, keyed by string ID. Fields are
//! plain JSON values; each implementation maps them to its own wire format.
//!
//! - [`FirestoreStore`] - Cloud Firestore REST API
//! - [`InMemoryDocumentStore`] - in-process store for development and tests

mod firestore;
mod memory;

pub use firestore::FirestoreStore;
pub use memory::InMemoryDocumentStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Document fields.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Boolean field, `None` when absent or not a boolean.
    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// String field, `None` when absent or not a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// External document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `None` if it doesn't exist.
    async fn get_document(&self, collection: &str, id: &str)
    -> Result<Option<Document>, DocumentError>;

    /// Write a document. With `merge`, only the given fields are replaced and
    /// the rest of an existing document is kept.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), DocumentError>;

    /// All documents in `collection` whose `field` equals `value`.
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, DocumentError>;
}
