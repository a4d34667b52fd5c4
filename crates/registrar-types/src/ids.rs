//! Type-safe identifier wrappers around relational surrogate keys.
//!
//! Every entity row has a strongly-typed ID to prevent accidental mixing of
//! identifiers at compile time. Values are assigned by `PostgreSQL`
//! (`BIGSERIAL`); the application never generates them.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an `i64` surrogate key.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the inner key value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a row in the `students` table.
    StudentId
}

define_id! {
    /// Identifier of a row in the `courses` table.
    CourseId
}

define_id! {
    /// Identifier of a row in the `enrollments` table.
    EnrollmentId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&StudentId(42)).unwrap_or_default();
        assert_eq!(json, "42");

        let parsed: Result<CourseId, _> = serde_json::from_str("7");
        assert_eq!(parsed.ok(), Some(CourseId(7)));
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(EnrollmentId(9).to_string(), "9");
        assert_eq!(i64::from(EnrollmentId(9)), 9);
    }
}
