//! Record store operations on the `students` table.

use chrono::NaiveDate;
use registrar_types::{EnrollmentId, NewStudent, Student, StudentId};
use sqlx::PgPool;

use crate::error::DbError;

/// Columns selected for every student query, in [`StudentRow`] order.
const STUDENT_COLUMNS: &str = "id, nume, prenume, email, data_nasterii";

/// Operations on the `students` table.
pub struct StudentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> StudentStore<'a> {
    /// Create a new student store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a student and return the committed row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateEmail`] if the email is already taken,
    /// or [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, student: &NewStudent) -> Result<Student, DbError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "INSERT INTO students (nume, prenume, email, data_nasterii)
             VALUES ($1, $2, $3, $4)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&student.last_name)
        .bind(&student.first_name)
        .bind(&student.email)
        .bind(student.birth_date)
        .fetch_one(self.pool)
        .await
        .map_err(|e| email_conflict(e, &student.email))?;

        tracing::debug!(student_id = row.id, "Inserted student");
        Ok(row.into())
    }

    /// Fetch a student by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: StudentId) -> Result<Option<Student>, DbError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Student::from))
    }

    /// Fetch a student by email address.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Student>, DbError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Student::from))
    }

    /// List students ordered by id, skipping `skip` rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Student>, DbError> {
        let rows = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    /// Keyset page of students with `id > after`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Student>, DbError> {
        let rows = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id > $1 ORDER BY id LIMIT $2"
        ))
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    /// Replace every column of an existing student.
    ///
    /// Returns `None` if no student has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateEmail`] if the new email belongs to
    /// another student, or [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        id: StudentId,
        student: &NewStudent,
    ) -> Result<Option<Student>, DbError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "UPDATE students
             SET nume = $1, prenume = $2, email = $3, data_nasterii = $4
             WHERE id = $5
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&student.last_name)
        .bind(&student.first_name)
        .bind(&student.email)
        .bind(student.birth_date)
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| email_conflict(e, &student.email))?;
        Ok(row.map(Student::from))
    }

    /// Delete a student together with its enrollments.
    ///
    /// Returns the ids of the enrollments removed by the cascade, or `None`
    /// if no student has this id. The student row is locked first so no
    /// enrollment can be added between collecting the ids and the delete.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the transaction fails.
    pub async fn delete(&self, id: StudentId) -> Result<Option<Vec<EnrollmentId>>, DbError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM students WHERE id = $1 FOR UPDATE")
                .bind(id.into_inner())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let cascaded: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM enrollments WHERE student_id = $1 ORDER BY id")
                .bind(id.into_inner())
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            student_id = id.into_inner(),
            cascaded = cascaded.len(),
            "Deleted student"
        );
        Ok(Some(cascaded.into_iter().map(EnrollmentId).collect()))
    }
}

/// Map a unique violation on `students` to [`DbError::DuplicateEmail`].
///
/// Email is the only unique column besides the primary key.
fn email_conflict(err: sqlx::Error, email: &str) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DbError::DuplicateEmail(email.to_owned());
        }
    }
    DbError::from_write(err)
}

/// A row from the `students` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    /// Surrogate key.
    pub id: i64,
    /// Family name.
    pub nume: String,
    /// Given name.
    pub prenume: String,
    /// Unique email.
    pub email: String,
    /// Date of birth.
    pub data_nasterii: NaiveDate,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentId(row.id),
            last_name: row.nume,
            first_name: row.prenume,
            email: row.email,
            birth_date: row.data_nasterii,
        }
    }
}
