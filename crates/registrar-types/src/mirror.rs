//! Derived mirror keys and the projection contract.
//!
//! A mirror document's identity is a pure function of entity kind and
//! relational id: `"<kind>_<id>"`. Because the key can always be
//! recomputed, no mapping table between the two stores is needed and an
//! upsert is simply "fetch by key, then write by key".

use serde::Serialize;
use serde_json::{Map, Value};

use crate::enums::EntityKind;
use crate::structs::{Course, Enrollment, Student};

/// The derived identifier of a mirror document, e.g. `student_42`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MirrorKey(String);

impl MirrorKey {
    /// Derive the key for the row `id` of the given kind.
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self(format!("{kind}_{id}"))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MirrorKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MirrorKey> for String {
    fn from(key: MirrorKey) -> Self {
        key.0
    }
}

/// An entity row that can be projected into the mirror store.
///
/// The scalar fields are the row's serde representation, so the mirror
/// document carries exactly the wire field names of the entity, dates as
/// ISO-8601 strings and absent optionals as `null`.
pub trait Mirrored: Serialize + Send + Sync {
    /// The kind written into the document's `type` field.
    const KIND: EntityKind;

    /// The relational surrogate key of this row.
    fn record_id(&self) -> i64;

    /// The derived mirror key of this row.
    fn mirror_key(&self) -> MirrorKey {
        MirrorKey::new(Self::KIND, self.record_id())
    }

    /// Every scalar field of the row, keyed by wire name.
    ///
    /// # Errors
    ///
    /// Fails if the row does not serialize to a JSON object.
    fn scalar_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(serde::ser::Error::custom(format!(
                "{} row serialized to a non-object: {other}",
                Self::KIND
            ))),
        }
    }
}

impl Mirrored for Student {
    const KIND: EntityKind = EntityKind::Student;

    fn record_id(&self) -> i64 {
        self.id.into_inner()
    }
}

impl Mirrored for Course {
    const KIND: EntityKind = EntityKind::Course;

    fn record_id(&self) -> i64 {
        self.id.into_inner()
    }
}

impl Mirrored for Enrollment {
    const KIND: EntityKind = EntityKind::Enrollment;

    fn record_id(&self) -> i64 {
        self.id.into_inner()
    }
}
