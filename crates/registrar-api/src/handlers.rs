//! REST endpoint handlers for the service facade.
//!
//! Every mutating handler follows the same order: validate the payload,
//! commit the write to the record store, then hand the committed row to a
//! post-commit hook in [`crate::hooks`]. A record store error returns
//! before any hook runs.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Liveness message |
//! | `POST` | `/students/` | Create a student (unique email) |
//! | `GET` | `/students/` | List students (`skip`, `limit`) |
//! | `GET` | `/students/{id}` | Get a single student |
//! | `PUT` | `/students/{id}` | Replace a student |
//! | `DELETE` | `/students/{id}` | Delete a student and its enrollments |
//! | `*` | `/courses/...` | Same shape for courses |
//! | `*` | `/enrollments/...` | Same shape for enrollments |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use registrar_db::{CourseStore, EnrollmentStore, StudentStore};
use registrar_types::{
    Course, CourseId, Enrollment, EnrollmentId, EntityKind, NewCourse, NewEnrollment, NewStudent,
    Student, StudentId,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::error::ApiError;
use crate::hooks;
use crate::state::AppState;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 100;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 1000;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Pagination parameters shared by every list endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    /// Rows to skip (default 0).
    pub skip: Option<i64>,
    /// Maximum rows to return (default 100, at most 1000).
    pub limit: Option<i64>,
}

impl ListQuery {
    /// Resolve defaults and reject out-of-range values.
    pub fn resolve(&self) -> Result<(i64, i64), ApiError> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if skip < 0 {
            return Err(ApiError::InvalidQuery(format!(
                "skip must be non-negative, got {skip}"
            )));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::InvalidQuery(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            )));
        }
        Ok((skip, limit))
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Liveness message with a pointer to the resource collections.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Registrar API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": ["/students/", "/courses/", "/enrollments/"],
    }))
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// Create a student. Rejects an email that is already registered.
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<Json<Student>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let store = StudentStore::new(state.records.pool());
    if store.find_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::DuplicateEmail);
    }
    let student = store.insert(&payload).await?;
    tracing::info!(student_id = %student.id, "Student created");

    hooks::on_created(&state.sync, &student).await;
    Ok(Json(student))
}

/// List students ordered by id.
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let (skip, limit) = query.resolve()?;
    let students = StudentStore::new(state.records.pool())
        .list(skip, limit)
        .await?;
    Ok(Json(students))
}

/// Get a single student.
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Student>, ApiError> {
    let id = StudentId(parse_id(&id_str, EntityKind::Student)?);
    StudentStore::new(state.records.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(EntityKind::Student))
}

/// Replace a student's fields.
pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<Json<Student>, ApiError> {
    let id = StudentId(parse_id(&id_str, EntityKind::Student)?);
    let Json(payload) = payload?;
    payload.validate()?;

    let student = StudentStore::new(state.records.pool())
        .update(id, &payload)
        .await?
        .ok_or_else(|| not_found(EntityKind::Student))?;
    tracing::info!(student_id = %student.id, "Student updated");

    hooks::on_updated(&state.sync, &student).await;
    Ok(Json(student))
}

/// Delete a student together with its enrollments.
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = StudentId(parse_id(&id_str, EntityKind::Student)?);
    let cascaded = StudentStore::new(state.records.pool())
        .delete(id)
        .await?
        .ok_or_else(|| not_found(EntityKind::Student))?;
    tracing::info!(student_id = %id, enrollments = cascaded.len(), "Student deleted");

    hooks::on_deleted(&state.sync, EntityKind::Student, id.into_inner(), cascaded).await;
    Ok(deleted(EntityKind::Student))
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// Create a course.
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCourse>, JsonRejection>,
) -> Result<Json<Course>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let course = CourseStore::new(state.records.pool())
        .insert(&payload)
        .await?;
    tracing::info!(course_id = %course.id, "Course created");

    hooks::on_created(&state.sync, &course).await;
    Ok(Json(course))
}

/// List courses ordered by id.
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let (skip, limit) = query.resolve()?;
    let courses = CourseStore::new(state.records.pool())
        .list(skip, limit)
        .await?;
    Ok(Json(courses))
}

/// Get a single course.
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Course>, ApiError> {
    let id = CourseId(parse_id(&id_str, EntityKind::Course)?);
    CourseStore::new(state.records.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(EntityKind::Course))
}

/// Replace a course's fields.
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    payload: Result<Json<NewCourse>, JsonRejection>,
) -> Result<Json<Course>, ApiError> {
    let id = CourseId(parse_id(&id_str, EntityKind::Course)?);
    let Json(payload) = payload?;
    payload.validate()?;

    let course = CourseStore::new(state.records.pool())
        .update(id, &payload)
        .await?
        .ok_or_else(|| not_found(EntityKind::Course))?;
    tracing::info!(course_id = %course.id, "Course updated");

    hooks::on_updated(&state.sync, &course).await;
    Ok(Json(course))
}

/// Delete a course together with its enrollments.
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = CourseId(parse_id(&id_str, EntityKind::Course)?);
    let cascaded = CourseStore::new(state.records.pool())
        .delete(id)
        .await?
        .ok_or_else(|| not_found(EntityKind::Course))?;
    tracing::info!(course_id = %id, enrollments = cascaded.len(), "Course deleted");

    hooks::on_deleted(&state.sync, EntityKind::Course, id.into_inner(), cascaded).await;
    Ok(deleted(EntityKind::Course))
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

/// Create an enrollment. Both referenced rows must exist.
pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewEnrollment>, JsonRejection>,
) -> Result<Json<Enrollment>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let enrollment = EnrollmentStore::new(state.records.pool())
        .insert(&payload)
        .await?;
    tracing::info!(
        enrollment_id = %enrollment.id,
        student_id = %enrollment.student_id,
        course_id = %enrollment.course_id,
        "Enrollment created"
    );

    hooks::on_created(&state.sync, &enrollment).await;
    Ok(Json(enrollment))
}

/// List enrollments ordered by id.
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    let (skip, limit) = query.resolve()?;
    let enrollments = EnrollmentStore::new(state.records.pool())
        .list(skip, limit)
        .await?;
    Ok(Json(enrollments))
}

/// Get a single enrollment.
pub async fn get_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Enrollment>, ApiError> {
    let id = EnrollmentId(parse_id(&id_str, EntityKind::Enrollment)?);
    EnrollmentStore::new(state.records.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(EntityKind::Enrollment))
}

/// Replace an enrollment's fields.
pub async fn update_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    payload: Result<Json<NewEnrollment>, JsonRejection>,
) -> Result<Json<Enrollment>, ApiError> {
    let id = EnrollmentId(parse_id(&id_str, EntityKind::Enrollment)?);
    let Json(payload) = payload?;
    payload.validate()?;

    let enrollment = EnrollmentStore::new(state.records.pool())
        .update(id, &payload)
        .await?
        .ok_or_else(|| not_found(EntityKind::Enrollment))?;
    tracing::info!(enrollment_id = %enrollment.id, "Enrollment updated");

    hooks::on_updated(&state.sync, &enrollment).await;
    Ok(Json(enrollment))
}

/// Delete an enrollment.
pub async fn delete_enrollment(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = EnrollmentId(parse_id(&id_str, EntityKind::Enrollment)?);
    if !EnrollmentStore::new(state.records.pool()).delete(id).await? {
        return Err(not_found(EntityKind::Enrollment));
    }
    tracing::info!(enrollment_id = %id, "Enrollment deleted");

    hooks::on_deleted(&state.sync, EntityKind::Enrollment, id.into_inner(), Vec::new()).await;
    Ok(deleted(EntityKind::Enrollment))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a path segment into a row id.
///
/// Non-numeric input is a bad request. A well-formed id that no row can
/// carry (zero or negative) is reported as missing, like any other absent id.
fn parse_id(s: &str, kind: EntityKind) -> Result<i64, ApiError> {
    match s.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err(not_found(kind)),
        Err(e) => Err(ApiError::InvalidQuery(format!("{s}: {e}"))),
    }
}

fn not_found(kind: EntityKind) -> ApiError {
    ApiError::NotFound(format!("{} not found", title(kind)))
}

fn deleted(kind: EntityKind) -> Json<Value> {
    Json(json!({ "message": format!("{} deleted successfully", title(kind)) }))
}

const fn title(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Student => "Student",
        EntityKind::Course => "Course",
        EntityKind::Enrollment => "Enrollment",
    }
}
