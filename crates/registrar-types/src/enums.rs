//! Enumeration types for the Registrar service.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of an authoritative entity.
///
/// The lowercase wire form is used both as the mirror document `type`
/// discriminator and as the prefix of the derived mirror key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A student row.
    Student,
    /// A course row.
    Course,
    /// An enrollment row linking a student to a course.
    Enrollment,
}

impl EntityKind {
    /// All kinds, in the order the bulk reconciler walks them.
    ///
    /// Parents come before enrollments so a reconciled mirror never holds
    /// an enrollment document whose student or course document is missing.
    pub const ALL: [Self; 3] = [Self::Student, Self::Course, Self::Enrollment];

    /// The lowercase wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Course => "course",
            Self::Enrollment => "enrollment",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name an [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "course" => Ok(Self::Course),
            "enrollment" => Ok(Self::Enrollment),
            other => Err(UnknownEntityKind(other.to_owned())),
        }
    }
}
