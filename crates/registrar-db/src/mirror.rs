//! Mirror store client abstraction.
//!
//! The mirror store is a schemaless document store holding a denormalized,
//! independently readable copy of every entity. Documents are addressed
//! only by their derived [`MirrorKey`]; there is no secondary index.
//!
//! # Document Layout
//!
//! ```text
//! { "_id": "student_1", "type": "student", "id": 1, "nume": "Ana", ... }
//! ```
//!
//! Two implementations exist: [`DragonflyMirror`](crate::DragonflyMirror)
//! for production and [`MemoryMirror`] for tests and local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use registrar_types::{EntityKind, MirrorKey};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::MirrorError;

/// A denormalized copy of one entity row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorDocument {
    /// The derived key, `"<kind>_<id>"`.
    #[serde(rename = "_id")]
    pub id: String,
    /// The entity kind discriminator.
    ///
    /// `None` only for a stored document whose `type` is missing or names
    /// no known kind. The next projection rewrites it.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    /// Scalar fields of the entity, keyed by wire name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MirrorDocument {
    /// Build a fresh document for `key` from the row's scalar fields.
    pub fn new(key: &MirrorKey, kind: EntityKind, fields: Map<String, Value>) -> Self {
        Self {
            id: key.as_str().to_owned(),
            kind: Some(kind),
            fields,
        }
    }

    /// Decode whatever JSON is stored at `key`.
    ///
    /// Any object is accepted: `_id` is taken from `key`, and a missing or
    /// unrecognised `type` decodes as `None` instead of failing, so a
    /// document written by another tool can still be merged into.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Malformed`] if `raw` is not a JSON object.
    pub fn from_stored(key: &MirrorKey, raw: Value) -> Result<Self, MirrorError> {
        let Value::Object(mut fields) = raw else {
            return Err(MirrorError::Malformed {
                key: key.to_string(),
                reason: String::from("stored value is not a JSON object"),
            });
        };
        fields.remove("_id");
        let kind = fields
            .remove("type")
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|name| name.parse::<EntityKind>().ok());

        Ok(Self {
            id: key.as_str().to_owned(),
            kind,
            fields,
        })
    }

    /// Overwrite this document with incoming scalar fields.
    ///
    /// Every incoming field replaces the stored value; fields the row no
    /// longer carries are left untouched. The `type` marker is always
    /// rewritten.
    pub fn merge(&mut self, kind: EntityKind, fields: Map<String, Value>) {
        self.kind = Some(kind);
        for (name, value) in fields {
            self.fields.insert(name, value);
        }
    }
}

/// Client handle to a mirror store.
///
/// Implementations must be cheap to share behind an [`Arc`](std::sync::Arc);
/// the sync engine and reconciler hold one injected handle for the lifetime
/// of the process.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Fetch the document at `key`, or `None` if absent.
    async fn fetch(&self, key: &MirrorKey) -> Result<Option<MirrorDocument>, MirrorError>;

    /// Insert or overwrite a document at its `_id`.
    async fn store(&self, document: &MirrorDocument) -> Result<(), MirrorError>;

    /// Delete the document at `key`. Returns whether a document existed.
    async fn remove(&self, key: &MirrorKey) -> Result<bool, MirrorError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), MirrorError>;
}

/// In-process mirror store backed by a [`BTreeMap`].
///
/// Holds encoded JSON values, like `Dragonfly` does, and decodes them with
/// [`MirrorDocument::from_stored`] on fetch. Used by tests and by local runs
/// configured with `mirror.backend: memory`.
/// [`MemoryMirror::set_offline`] makes every call fail with
/// [`MirrorError::Unavailable`] to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    documents: RwLock<BTreeMap<String, Value>>,
    offline: AtomicBool,
}

impl MemoryMirror {
    /// Create an empty, online mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going down (`true`) or coming back (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the mirror holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// All stored document ids, in key order.
    pub async fn keys(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    /// Place an arbitrary JSON value at `key`, bypassing document encoding.
    pub async fn put_raw(&self, key: &MirrorKey, raw: Value) {
        self.documents
            .write()
            .await
            .insert(key.as_str().to_owned(), raw);
    }

    fn ensure_online(&self) -> Result<(), MirrorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable(String::from(
                "in-memory mirror is offline",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MirrorStore for MemoryMirror {
    async fn fetch(&self, key: &MirrorKey) -> Result<Option<MirrorDocument>, MirrorError> {
        self.ensure_online()?;
        let raw = self.documents.read().await.get(key.as_str()).cloned();
        raw.map(|value| MirrorDocument::from_stored(key, value))
            .transpose()
    }

    async fn store(&self, document: &MirrorDocument) -> Result<(), MirrorError> {
        self.ensure_online()?;
        let value = serde_json::to_value(document)?;
        self.documents
            .write()
            .await
            .insert(document.id.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &MirrorKey) -> Result<bool, MirrorError> {
        self.ensure_online()?;
        Ok(self.documents.write().await.remove(key.as_str()).is_some())
    }

    async fn close(&self) -> Result<(), MirrorError> {
        Ok(())
    }
}
