//! Entity rows and their input payloads.
//!
//! Field names on the wire (`nume`, `prenume`, `nume_curs`, ...) are the
//! names the HTTP API and the mirror documents have always used. The Rust
//! field names are descriptive; serde renames bridge the two.
//!
//! The `New*` payloads carry every column except the surrogate key and are
//! used for both creation and full-replacement updates. They are validated
//! with [`validator`] before any storage call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::{CourseId, EnrollmentId, StudentId};

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

/// A student row as committed in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Surrogate key.
    pub id: StudentId,
    /// Family name.
    #[serde(rename = "nume")]
    pub last_name: String,
    /// Given name.
    #[serde(rename = "prenume")]
    pub first_name: String,
    /// Unique contact address; identity key for lookup-before-create.
    pub email: String,
    /// Date of birth.
    #[serde(rename = "data_nasterii")]
    pub birth_date: NaiveDate,
}

/// Payload for creating or replacing a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewStudent {
    /// Family name.
    #[serde(rename = "nume")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Given name.
    #[serde(rename = "prenume")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    /// Contact address, unique across students.
    #[validate(email, length(max = 150))]
    pub email: String,
    /// Date of birth.
    #[serde(rename = "data_nasterii")]
    pub birth_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// A course row as committed in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Surrogate key.
    pub id: CourseId,
    /// Course title.
    #[serde(rename = "nume_curs")]
    pub title: String,
    /// Credit count, never negative.
    #[serde(rename = "credite")]
    pub credits: i32,
    /// Name of the instructor, when assigned.
    #[serde(rename = "profesor")]
    pub instructor: Option<String>,
}

/// Payload for creating or replacing a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewCourse {
    /// Course title.
    #[serde(rename = "nume_curs")]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Credit count.
    #[serde(rename = "credite")]
    #[validate(range(min = 0))]
    pub credits: i32,
    /// Name of the instructor, when assigned.
    #[serde(rename = "profesor", default)]
    #[validate(length(max = 100))]
    pub instructor: Option<String>,
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

/// An enrollment row linking a student to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Surrogate key.
    pub id: EnrollmentId,
    /// The enrolled student. Must reference an existing row.
    pub student_id: StudentId,
    /// The course enrolled in. Must reference an existing row.
    #[serde(rename = "curs_id")]
    pub course_id: CourseId,
    /// Date the enrollment took effect.
    #[serde(rename = "data_inrolare")]
    pub enrolled_on: NaiveDate,
    /// Final grade on the 0-10 scale, once awarded.
    #[serde(rename = "nota")]
    pub grade: Option<f64>,
}

/// Payload for creating or replacing an enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewEnrollment {
    /// The enrolled student.
    pub student_id: StudentId,
    /// The course enrolled in.
    #[serde(rename = "curs_id")]
    pub course_id: CourseId,
    /// Date the enrollment took effect.
    #[serde(rename = "data_inrolare")]
    pub enrolled_on: NaiveDate,
    /// Final grade on the 0-10 scale, once awarded.
    #[serde(rename = "nota", default)]
    #[validate(range(min = 0.0, max = 10.0))]
    pub grade: Option<f64>,
}
