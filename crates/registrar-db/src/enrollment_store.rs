//! Record store operations on the `enrollments` table.
//!
//! Both references are foreign keys; inserting or updating an enrollment
//! that points at a missing student or course fails with
//! [`DbError::Integrity`] and nothing is written.

use chrono::NaiveDate;
use registrar_types::{CourseId, Enrollment, EnrollmentId, NewEnrollment, StudentId};
use sqlx::PgPool;

use crate::error::DbError;

/// Columns selected for every enrollment query, in [`EnrollmentRow`] order.
const ENROLLMENT_COLUMNS: &str = "id, student_id, curs_id, data_inrolare, nota";

/// Operations on the `enrollments` table.
pub struct EnrollmentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EnrollmentStore<'a> {
    /// Create a new enrollment store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an enrollment and return the committed row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Integrity`] if the student or course does not
    /// exist, or [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, enrollment: &NewEnrollment) -> Result<Enrollment, DbError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "INSERT INTO enrollments (student_id, curs_id, data_inrolare, nota)
             VALUES ($1, $2, $3, $4)
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(enrollment.student_id.into_inner())
        .bind(enrollment.course_id.into_inner())
        .bind(enrollment.enrolled_on)
        .bind(enrollment.grade)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from_write)?;

        tracing::debug!(enrollment_id = row.id, "Inserted enrollment");
        Ok(row.into())
    }

    /// Fetch an enrollment by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: EnrollmentId) -> Result<Option<Enrollment>, DbError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Enrollment::from))
    }

    /// List enrollments ordered by id, skipping `skip` rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Enrollment>, DbError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    /// Keyset page of enrollments with `id > after`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Enrollment>, DbError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id > $1 ORDER BY id LIMIT $2"
        ))
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    /// Replace every column of an existing enrollment.
    ///
    /// Returns `None` if no enrollment has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Integrity`] if the new student or course does not
    /// exist, or [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        id: EnrollmentId,
        enrollment: &NewEnrollment,
    ) -> Result<Option<Enrollment>, DbError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
            "UPDATE enrollments
             SET student_id = $1, curs_id = $2, data_inrolare = $3, nota = $4
             WHERE id = $5
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(enrollment.student_id.into_inner())
        .bind(enrollment.course_id.into_inner())
        .bind(enrollment.enrolled_on)
        .bind(enrollment.grade)
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await
        .map_err(DbError::from_write)?;
        Ok(row.map(Enrollment::from))
    }

    /// Delete an enrollment. Returns `false` if no enrollment has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: EnrollmentId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `enrollments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    /// Surrogate key.
    pub id: i64,
    /// Referenced student.
    pub student_id: i64,
    /// Referenced course.
    pub curs_id: i64,
    /// Enrollment date.
    pub data_inrolare: NaiveDate,
    /// Grade, if awarded.
    pub nota: Option<f64>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            id: EnrollmentId(row.id),
            student_id: StudentId(row.student_id),
            course_id: CourseId(row.curs_id),
            enrolled_on: row.data_inrolare,
            grade: row.nota,
        }
    }
}
