//! Record store operations on the `courses` table.

use registrar_types::{Course, CourseId, EnrollmentId, NewCourse};
use sqlx::PgPool;

use crate::error::DbError;

/// Columns selected for every course query, in [`CourseRow`] order.
const COURSE_COLUMNS: &str = "id, nume_curs, credite, profesor";

/// Operations on the `courses` table.
pub struct CourseStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CourseStore<'a> {
    /// Create a new course store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a course and return the committed row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Integrity`] if a constraint rejects the row, or
    /// [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, course: &NewCourse) -> Result<Course, DbError> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "INSERT INTO courses (nume_curs, credite, profesor)
             VALUES ($1, $2, $3)
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(&course.title)
        .bind(course.credits)
        .bind(course.instructor.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from_write)?;

        tracing::debug!(course_id = row.id, "Inserted course");
        Ok(row.into())
    }

    /// Fetch a course by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: CourseId) -> Result<Option<Course>, DbError> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Course::from))
    }

    /// List courses ordered by id, skipping `skip` rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Course>, DbError> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    /// Keyset page of courses with `id > after`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Course>, DbError> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id > $1 ORDER BY id LIMIT $2"
        ))
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    /// Replace every column of an existing course.
    ///
    /// Returns `None` if no course has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Integrity`] if a constraint rejects the row, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn update(&self, id: CourseId, course: &NewCourse) -> Result<Option<Course>, DbError> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "UPDATE courses
             SET nume_curs = $1, credite = $2, profesor = $3
             WHERE id = $4
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(&course.title)
        .bind(course.credits)
        .bind(course.instructor.as_deref())
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await
        .map_err(DbError::from_write)?;
        Ok(row.map(Course::from))
    }

    /// Delete a course together with its enrollments.
    ///
    /// Returns the ids of the enrollments removed by the cascade, or `None`
    /// if no course has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the transaction fails.
    pub async fn delete(&self, id: CourseId) -> Result<Option<Vec<EnrollmentId>>, DbError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
                .bind(id.into_inner())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let cascaded: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM enrollments WHERE curs_id = $1 ORDER BY id")
                .bind(id.into_inner())
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            course_id = id.into_inner(),
            cascaded = cascaded.len(),
            "Deleted course"
        );
        Ok(Some(cascaded.into_iter().map(EnrollmentId).collect()))
    }
}

/// A row from the `courses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    /// Surrogate key.
    pub id: i64,
    /// Course title.
    pub nume_curs: String,
    /// Credit count.
    pub credite: i32,
    /// Instructor name.
    pub profesor: Option<String>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: CourseId(row.id),
            title: row.nume_curs,
            credits: row.credite,
            instructor: row.profesor,
        }
    }
}
