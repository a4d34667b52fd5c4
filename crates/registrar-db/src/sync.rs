//! The sync engine: projecting committed relational rows into the mirror.
//!
//! Every operation here runs *after* the relational transaction has
//! committed. The mirror is best-effort: failures come back as an explicit
//! [`SyncError`] for the caller to log, and never undo the relational write.
//! Recovery from a missed projection is a re-run of the
//! [`Reconciler`](crate::Reconciler).
//!
//! # Protocol
//!
//! ```text
//! project(kind, row)
//!     |
//!     +-- key = "<kind>_<id>"
//!     +-- fetch(key)
//!          |-- found  --> merge fields, overwrite type, store  (Updated)
//!          +-- absent --> new document with _id + type, store  (Created)
//!
//! retract(kind, id)
//!     +-- remove(key)   (Removed | Absent)
//! ```
//!
//! Concurrent projections of the same key are not serialized: each is a
//! fetch-merge-store sequence and the last store wins.

use std::sync::Arc;

use registrar_types::{EntityKind, MirrorKey, Mirrored};
use serde_json::{Map, Value};

use crate::error::MirrorError;
use crate::mirror::{MirrorDocument, MirrorStore};

/// What a successful projection did.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// No document existed; a new one was inserted.
    Created,
    /// An existing document was overwritten.
    Updated,
}

/// What a successful retraction did.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retraction {
    /// The document existed and was deleted.
    Removed,
    /// No document existed; nothing to do.
    Absent,
}

/// A projection or retraction that did not reach the mirror.
#[derive(Debug, thiserror::Error)]
#[error("mirror sync failed for {key}: {source}")]
pub struct SyncError {
    /// The derived key the operation targeted.
    pub key: MirrorKey,
    /// The underlying mirror failure.
    #[source]
    pub source: MirrorError,
}

/// Projects relational rows into the mirror store.
///
/// Holds an injected mirror handle; cloning the engine shares the handle.
#[derive(Clone)]
pub struct SyncEngine {
    mirror: Arc<dyn MirrorStore>,
}

impl SyncEngine {
    /// Create an engine writing to the given mirror store.
    pub fn new(mirror: Arc<dyn MirrorStore>) -> Self {
        Self { mirror }
    }

    /// Project a committed row into its mirror document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the row cannot be encoded or the mirror
    /// store fails. The mirror may be stale or missing the document
    /// afterwards.
    pub async fn project<R: Mirrored>(&self, record: &R) -> Result<Projection, SyncError> {
        let key = record.mirror_key();
        match record.scalar_fields() {
            Ok(fields) => self.project_fields(R::KIND, key, fields).await,
            Err(e) => Err(SyncError {
                key,
                source: MirrorError::Serialization(e),
            }),
        }
    }

    /// Project an already-encoded field map under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the mirror store fails.
    pub async fn project_fields(
        &self,
        kind: EntityKind,
        key: MirrorKey,
        fields: Map<String, Value>,
    ) -> Result<Projection, SyncError> {
        let existing = match self.mirror.fetch(&key).await {
            Ok(existing) => existing,
            Err(MirrorError::Malformed { reason, .. }) => {
                tracing::warn!(key = %key, %reason, "Replacing undecodable mirror document");
                None
            }
            Err(source) => return Err(SyncError { key, source }),
        };

        let (document, projection) = match existing {
            Some(mut document) => {
                document.merge(kind, fields);
                (document, Projection::Updated)
            }
            None => (
                MirrorDocument::new(&key, kind, fields),
                Projection::Created,
            ),
        };

        match self.mirror.store(&document).await {
            Ok(()) => Ok(projection),
            Err(source) => Err(SyncError { key, source }),
        }
    }

    /// Remove the mirror document of a deleted row.
    ///
    /// Idempotent: retracting a key with no document is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the mirror store fails.
    pub async fn retract(
        &self,
        kind: EntityKind,
        record_id: i64,
    ) -> Result<Retraction, SyncError> {
        let key = MirrorKey::new(kind, record_id);
        match self.mirror.remove(&key).await {
            Ok(true) => Ok(Retraction::Removed),
            Ok(false) => Ok(Retraction::Absent),
            Err(source) => Err(SyncError { key, source }),
        }
    }

    /// Close the mirror connection. Called once at process shutdown.
    pub async fn shutdown(&self) {
        if let Err(e) = self.mirror.close().await {
            tracing::warn!(error = %e, "Failed to close mirror store cleanly");
        }
    }
}

/// Log the outcome of a projection: `debug` on success, `warn` on failure.
pub fn log_projection(key: &MirrorKey, outcome: &Result<Projection, SyncError>) {
    match outcome {
        Ok(projection) => tracing::debug!(key = %key, ?projection, "Projected row to mirror"),
        Err(e) => tracing::warn!(key = %e.key, error = %e.source, "Mirror projection failed"),
    }
}

/// Log the outcome of a retraction: `debug` on success, `warn` on failure.
pub fn log_retraction(key: &MirrorKey, outcome: &Result<Retraction, SyncError>) {
    match outcome {
        Ok(retraction) => tracing::debug!(key = %key, ?retraction, "Retracted mirror document"),
        Err(e) => tracing::warn!(key = %e.key, error = %e.source, "Mirror retraction failed"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use registrar_types::{Course, CourseId, Student, StudentId};
    use serde_json::json;

    use super::*;
    use crate::mirror::MemoryMirror;

    fn ana() -> Student {
        Student {
            id: StudentId(1),
            last_name: String::from("Ana"),
            first_name: String::from("Pop"),
            email: String::from("ana@example.com"),
            birth_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }

    fn engine() -> (Arc<MemoryMirror>, SyncEngine) {
        let mirror = Arc::new(MemoryMirror::new());
        let engine = SyncEngine::new(Arc::clone(&mirror) as Arc<dyn MirrorStore>);
        (mirror, engine)
    }

    async fn fetch(mirror: &MemoryMirror, kind: EntityKind, id: i64) -> Option<MirrorDocument> {
        mirror.fetch(&MirrorKey::new(kind, id)).await.ok().flatten()
    }

    #[tokio::test]
    async fn first_projection_creates_document_with_every_field() {
        let (mirror, engine) = engine();

        let outcome = engine.project(&ana()).await;
        assert!(matches!(outcome, Ok(Projection::Created)));

        let doc = fetch(&mirror, EntityKind::Student, 1).await;
        let value = serde_json::to_value(doc).unwrap_or_default();
        assert_eq!(
            value,
            json!({
                "_id": "student_1",
                "type": "student",
                "id": 1,
                "nume": "Ana",
                "prenume": "Pop",
                "email": "ana@example.com",
                "data_nasterii": "2000-01-01",
            })
        );
    }

    #[tokio::test]
    async fn second_projection_updates_in_place() {
        let (mirror, engine) = engine();
        let _ = engine.project(&ana()).await;

        let renamed = Student {
            last_name: String::from("Ana-Maria"),
            ..ana()
        };
        assert!(matches!(
            engine.project(&renamed).await,
            Ok(Projection::Updated)
        ));

        let doc = fetch(&mirror, EntityKind::Student, 1).await;
        assert_eq!(doc.as_ref().map(|d| d.id.as_str()), Some("student_1"));
        assert_eq!(
            doc.as_ref().and_then(|d| d.fields.get("nume")),
            Some(&json!("Ana-Maria"))
        );
        assert_eq!(mirror.len().await, 1);
    }

    #[tokio::test]
    async fn repeated_projection_is_idempotent() {
        let (mirror, engine) = engine();
        let _ = engine.project(&ana()).await;
        let once = fetch(&mirror, EntityKind::Student, 1).await;

        let _ = engine.project(&ana()).await;
        let twice = fetch(&mirror, EntityKind::Student, 1).await;

        assert!(once.is_some());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn update_overwrites_a_stale_type_marker() {
        let (mirror, engine) = engine();
        let key = MirrorKey::new(EntityKind::Course, 4);
        let stale = MirrorDocument::new(&key, EntityKind::Student, Map::new());
        assert!(mirror.store(&stale).await.is_ok());

        let course = Course {
            id: CourseId(4),
            title: String::from("Retele"),
            credits: 5,
            instructor: None,
        };
        assert!(matches!(
            engine.project(&course).await,
            Ok(Projection::Updated)
        ));

        let doc = fetch(&mirror, EntityKind::Course, 4).await;
        assert_eq!(doc.as_ref().and_then(|d| d.kind), Some(EntityKind::Course));
        assert_eq!(
            doc.as_ref().and_then(|d| d.fields.get("profesor")),
            Some(&Value::Null)
        );
    }

    #[tokio::test]
    async fn update_repairs_a_foreign_type_marker() {
        let (mirror, engine) = engine();
        let key = MirrorKey::new(EntityKind::Student, 1);
        mirror
            .put_raw(
                &key,
                json!({"_id": "student_1", "type": "Student", "nume": "Old", "legacy": true}),
            )
            .await;

        assert!(matches!(
            engine.project(&ana()).await,
            Ok(Projection::Updated)
        ));

        let value = serde_json::to_value(fetch(&mirror, EntityKind::Student, 1).await)
            .unwrap_or_default();
        assert_eq!(value["type"], "student");
        assert_eq!(value["_id"], "student_1");
        assert_eq!(value["nume"], "Ana");
        assert_eq!(value["legacy"], true);
    }

    #[tokio::test]
    async fn update_adds_a_missing_type_marker() {
        let (mirror, engine) = engine();
        let key = MirrorKey::new(EntityKind::Student, 1);
        mirror.put_raw(&key, json!({"nume": "Old"})).await;

        assert!(matches!(
            engine.project(&ana()).await,
            Ok(Projection::Updated)
        ));
        let doc = fetch(&mirror, EntityKind::Student, 1).await;
        assert_eq!(doc.as_ref().and_then(|d| d.kind), Some(EntityKind::Student));
    }

    #[tokio::test]
    async fn undecodable_document_is_replaced() {
        let (mirror, engine) = engine();
        let key = MirrorKey::new(EntityKind::Student, 1);
        mirror.put_raw(&key, json!("not a document")).await;

        assert!(matches!(
            engine.project(&ana()).await,
            Ok(Projection::Created)
        ));
        let doc = fetch(&mirror, EntityKind::Student, 1).await;
        assert_eq!(
            doc.as_ref().and_then(|d| d.fields.get("email")),
            Some(&json!("ana@example.com"))
        );
    }

    #[tokio::test]
    async fn retract_removes_then_is_a_no_op() {
        let (mirror, engine) = engine();
        let _ = engine.project(&ana()).await;

        assert!(matches!(
            engine.retract(EntityKind::Student, 1).await,
            Ok(Retraction::Removed)
        ));
        assert!(fetch(&mirror, EntityKind::Student, 1).await.is_none());

        assert!(matches!(
            engine.retract(EntityKind::Student, 1).await,
            Ok(Retraction::Absent)
        ));
    }

    #[tokio::test]
    async fn mirror_outage_is_reported_not_raised() {
        let (mirror, engine) = engine();
        mirror.set_offline(true);

        let projected = engine.project(&ana()).await;
        let err = projected.err();
        assert_eq!(err.as_ref().map(|e| e.key.as_str()), Some("student_1"));
        assert!(matches!(
            err.map(|e| e.source),
            Some(MirrorError::Unavailable(_))
        ));

        assert!(engine.retract(EntityKind::Student, 1).await.is_err());

        mirror.set_offline(false);
        assert!(mirror.is_empty().await);
    }

    #[tokio::test]
    async fn shutdown_closes_the_mirror_without_error() {
        let (_mirror, engine) = engine();
        engine.shutdown().await;
    }
}
