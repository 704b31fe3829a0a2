//! Cloud Firestore REST client.
//!
//! Documents live under
//! `{base}/projects/{project}/databases/(default)/documents/{collection}/{id}`.
//! Firestore wraps every value in a typed envelope (`stringValue`,
//! `booleanValue`, ...); [`encode_value`] and [`decode_value`] convert between
//! that and plain JSON.
//!
//! Calls carry only the web API key, never a user's ID token, so the project's
//! security rules must let the server read and write `users/{id}` and run the
//! `username` equality query without `request.auth`. Per-user rules such as
//! `request.auth.uid == userId` answer 403 to every call here.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;
use url::Url;

use super::{Document, DocumentError, DocumentStore, Fields};
use crate::config::FirebaseConfig;

/// Request timeout for document calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Firestore REST client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_root: String,
    api_key: SecretString,
}

impl FirestoreStore {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, DocumentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            documents_root: format!(
                "{}/projects/{}/databases/(default)/documents",
                config.firestore_url.trim_end_matches('/'),
                config.project_id
            ),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, suffix: &str) -> Result<Url, DocumentError> {
        let mut url = Url::parse(&format!("{}{suffix}", self.documents_root))
            .map_err(|e| DocumentError::Parse(format!("invalid document URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, DocumentError> {
        self.url(&format!(
            "/{}/{}",
            urlencoding::encode(collection),
            urlencoding::encode(id)
        ))
    }
}

/// Turn a non-success response into `DocumentError::Api`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DocumentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|envelope| envelope.error.message)
        .unwrap_or(text);
    if status == reqwest::StatusCode::FORBIDDEN {
        tracing::error!(
            message = %message,
            "Firestore denied an unauthenticated call; security rules must allow server access"
        );
    }
    Err(DocumentError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, DocumentError> {
        let url = self.document_url(collection, id)?;
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let raw: RawDocument = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DocumentError::Parse(e.to_string()))?;
        raw.into_document().map(Some)
    }

    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), DocumentError> {
        let mut url = self.document_url(collection, id)?;
        if merge {
            let mut pairs = url.query_pairs_mut();
            for name in fields.keys() {
                pairs.append_pair("updateMask.fieldPaths", name);
            }
        }

        let body = json!({ "fields": encode_fields(&fields) });
        let response = self.client.patch(url).json(&body).send().await?;
        check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self, value))]
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, DocumentError> {
        let url = self.url(":runQuery")?;
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(value),
                    }
                }
            }
        });

        let response = self.client.post(url).json(&body).send().await?;
        let rows: Vec<QueryRow> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DocumentError::Parse(e.to_string()))?;

        rows.into_iter()
            .filter_map(|row| row.document)
            .map(RawDocument::into_document)
            .collect()
    }
}

// =============================================================================
// Value Encoding
// =============================================================================

/// Wrap plain JSON in Firestore's typed value envelope.
#[must_use]
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore sends and expects 64-bit integers as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Unwrap a Firestore typed value into plain JSON.
///
/// # Errors
///
/// Returns `DocumentError::Parse` for an unrecognized envelope.
pub fn decode_value(value: &Value) -> Result<Value, DocumentError> {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(DocumentError::Parse(format!("not a typed value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => Ok(inner.clone()),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from)
            .ok_or_else(|| DocumentError::Parse(format!("bad integerValue: {inner}"))),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or_else(
                || Ok(Vec::new()),
                |items| items.iter().map(decode_value).collect(),
            )
            .map(Value::Array),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            decode_fields(&fields).map(Value::Object)
        }
        other => Err(DocumentError::Parse(format!("unknown value type: {other}"))),
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, DocumentError> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Result<Document, DocumentError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DocumentError::Parse(format!("bad document name: {}", self.name)))?
            .to_string();

        Ok(Document {
            id,
            fields: decode_fields(&self.fields)?,
        })
    }
}

#[derive(Deserialize)]
struct QueryRow {
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const DOCS: &str = "/v1/projects/demo-project/databases/(default)/documents";

    fn store_for(server: &MockServer) -> FirestoreStore {
        let mut config = FirebaseConfig::demo();
        config.api_key = SecretString::from("test-key");
        config.firestore_url = format!("{}/v1", server.uri());
        FirestoreStore::new(&config).unwrap()
    }

    #[test]
    fn test_encode_value_shapes() {
        assert_eq!(
            encode_value(&json!("ada")),
            json!({ "stringValue": "ada" })
        );
        assert_eq!(
            encode_value(&json!(true)),
            json!({ "booleanValue": true })
        );
        assert_eq!(encode_value(&json!(7)), json!({ "integerValue": "7" }));
        assert_eq!(
            encode_value(&json!(["a"])),
            json!({ "arrayValue": { "values": [{ "stringValue": "a" }] } })
        );
    }

    #[test]
    fn test_decode_nested_document_fields() {
        let raw = json!({
            "tags": { "arrayValue": { "values": [{ "stringValue": "research" }] } },
            "count": { "integerValue": "3" },
            "meta": { "mapValue": { "fields": { "ok": { "booleanValue": true } } } },
            "empty": { "arrayValue": {} }
        });
        let decoded = decode_fields(raw.as_object().unwrap()).unwrap();

        assert_eq!(decoded["tags"], json!(["research"]));
        assert_eq!(decoded["count"], json!(3));
        assert_eq!(decoded["meta"], json!({ "ok": true }));
        assert_eq!(decoded["empty"], json!([]));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(decode_value(&json!({ "mysteryValue": 1 })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[tokio::test]
    async fn test_get_document_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{DOCS}/users/missing")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.get_document("users", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_permission_denied_surfaces_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{DOCS}/users/u1")))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Missing or insufficient permissions.",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store
            .set_document("users", "u1", Fields::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Api { status: 403, ref message }
                if message == "Missing or insufficient permissions."
        ));
    }

    #[tokio::test]
    async fn test_get_document_decodes_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{DOCS}/users/u1")))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo-project/databases/(default)/documents/users/u1",
                "fields": { "onboardingComplete": { "booleanValue": true } }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let doc = store.get_document("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.id, "u1");
        assert_eq!(doc.bool_field("onboardingComplete"), Some(true));
    }

    #[tokio::test]
    async fn test_merge_write_sends_update_mask() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{DOCS}/users/u1")))
            .and(query_param("updateMask.fieldPaths", "onboardingComplete"))
            .and(body_partial_json(json!({
                "fields": { "onboardingComplete": { "booleanValue": true } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo-project/databases/(default)/documents/users/u1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let mut fields = Fields::new();
        fields.insert("onboardingComplete".to_string(), json!(true));
        store.set_document("users", "u1", fields, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_where_collects_documents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .and(body_partial_json(json!({
                "structuredQuery": {
                    "where": { "fieldFilter": {
                        "field": { "fieldPath": "username" },
                        "op": "EQUAL",
                        "value": { "stringValue": "ada" }
                    } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "document": {
                        "name": "projects/demo-project/databases/(default)/documents/users/u7",
                        "fields": { "username": { "stringValue": "ada" } }
                    },
                    "readTime": "2026-01-01T00:00:00Z"
                }
            ])))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let docs = store
            .query_where("users", "username", &json!("ada"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.first().unwrap().id, "u7");
    }

    #[tokio::test]
    async fn test_empty_query_result_has_only_read_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{DOCS}:runQuery")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "readTime": "2026-01-01T00:00:00Z" }])),
            )
            .mount(&server)
            .await;

        let store = store_for(&server);
        let docs = store
            .query_where("users", "username", &json!("nobody"))
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{DOCS}/users/u1")))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "Missing or insufficient permissions." }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store.get_document("users", "u1").await.unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Api { status: 403, ref message } if message == "Missing or insufficient permissions."
        ));
    }
}
