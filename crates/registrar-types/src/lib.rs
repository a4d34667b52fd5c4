//! Shared type definitions for the Registrar service.
//!
//! This crate is the single source of truth for the three authoritative
//! entities (students, courses, enrollments) and for the contract that
//! turns a relational row into a mirror document.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer wrappers for relational identifiers
//! - [`enums`] -- The [`EntityKind`] discriminator
//! - [`structs`] -- Entity rows and their create/update payloads
//! - [`mirror`] -- Derived mirror keys and the [`Mirrored`] projection trait

pub mod enums;
pub mod ids;
pub mod mirror;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EntityKind, UnknownEntityKind};
pub use ids::{CourseId, EnrollmentId, StudentId};
pub use mirror::{MirrorKey, Mirrored};
pub use structs::{Course, Enrollment, NewCourse, NewEnrollment, NewStudent, Student};
