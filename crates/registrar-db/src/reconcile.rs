//! The bulk reconciler: re-projecting every relational row into the mirror.
//!
//! Used once when the mirror store is introduced and again after any
//! outage long enough that live projections were lost. Because projection
//! is an upsert keyed by a derived id, running the reconciler any number of
//! times converges on the same mirror contents.
//!
//! Rows are walked one entity kind at a time (students, courses,
//! enrollments), in id order, one keyset page at a time, and projected
//! sequentially on the calling task. A failed projection is recorded and
//! the walk continues; a failed page read ends the walk of that kind only.

use async_trait::async_trait;
use registrar_types::{Course, EntityKind, Enrollment, MirrorKey, Mirrored, Student};

use crate::course_store::CourseStore;
use crate::enrollment_store::EnrollmentStore;
use crate::error::DbError;
use crate::postgres::PostgresPool;
use crate::student_store::StudentStore;
use crate::sync::{Projection, SyncEngine};

/// Default number of rows fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// A paginated source of committed rows of one entity kind.
#[async_trait]
pub trait RecordPages<R: Mirrored>: Send + Sync {
    /// Up to `limit` rows with `id > after`, ordered by id ascending.
    ///
    /// Surrogate keys start at 1, so `after = 0` yields the first page.
    async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<R>, DbError>;
}

#[async_trait]
impl RecordPages<Student> for PostgresPool {
    async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Student>, DbError> {
        StudentStore::new(self.pool()).page_after(after, limit).await
    }
}

#[async_trait]
impl RecordPages<Course> for PostgresPool {
    async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Course>, DbError> {
        CourseStore::new(self.pool()).page_after(after, limit).await
    }
}

#[async_trait]
impl RecordPages<Enrollment> for PostgresPool {
    async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Enrollment>, DbError> {
        EnrollmentStore::new(self.pool()).page_after(after, limit).await
    }
}

/// One row whose projection failed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    /// The mirror key that was not written.
    pub key: MirrorKey,
    /// The error that prevented the write.
    pub error: String,
}

/// Outcome of reconciling one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    /// The entity kind walked.
    pub kind: EntityKind,
    /// Rows whose document did not exist yet.
    pub created: u64,
    /// Rows whose existing document was overwritten.
    pub updated: u64,
    /// Rows whose projection failed.
    pub failures: Vec<ReconcileFailure>,
    /// Set when reading a page from the record store failed, ending the walk.
    pub source_error: Option<String>,
}

impl KindReport {
    const fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            created: 0,
            updated: 0,
            failures: Vec::new(),
            source_error: None,
        }
    }

    /// Number of rows projected successfully.
    pub const fn projected(&self) -> u64 {
        self.created.saturating_add(self.updated)
    }

    /// Number of rows whose projection failed.
    pub fn failed(&self) -> u64 {
        u64::try_from(self.failures.len()).unwrap_or(u64::MAX)
    }

    /// Whether every row of this kind reached the mirror.
    pub const fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.source_error.is_none()
    }
}

/// Aggregate outcome of a full reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Per-kind results, in walk order.
    pub kinds: Vec<KindReport>,
}

impl ReconcileReport {
    /// Rows projected successfully across all kinds.
    pub fn projected(&self) -> u64 {
        self.kinds
            .iter()
            .fold(0_u64, |acc, k| acc.saturating_add(k.projected()))
    }

    /// Rows whose projection failed across all kinds.
    pub fn failed(&self) -> u64 {
        self.kinds
            .iter()
            .fold(0_u64, |acc, k| acc.saturating_add(k.failed()))
    }

    /// Rows visited across all kinds.
    pub fn total(&self) -> u64 {
        self.projected().saturating_add(self.failed())
    }

    /// Whether the mirror is now complete for every row visited.
    pub fn is_clean(&self) -> bool {
        self.kinds.iter().all(KindReport::is_clean)
    }

    /// Turn any failure into a [`ReconcileError`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::PartialFailure`] if any row failed or any
    /// kind could not be read completely.
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        if self.is_clean() {
            return Ok(self);
        }
        let incomplete = self
            .kinds
            .iter()
            .filter(|k| k.source_error.is_some())
            .map(|k| k.kind)
            .collect();
        Err(ReconcileError::PartialFailure {
            failed: self.failed(),
            total: self.total(),
            incomplete,
        })
    }
}

/// A reconciliation run that did not bring the mirror fully up to date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Some rows failed to project, or some kinds could not be read.
    #[error("reconciliation incomplete: {failed} of {total} rows failed, unreadable kinds: {incomplete:?}")]
    PartialFailure {
        /// Rows whose projection failed.
        failed: u64,
        /// Rows visited.
        total: u64,
        /// Kinds whose walk ended early on a record store error.
        incomplete: Vec<EntityKind>,
    },
}

/// Walks the record store and re-projects every row.
pub struct Reconciler<'a> {
    engine: &'a SyncEngine,
    page_size: u32,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler projecting through `engine`.
    pub const fn new(engine: &'a SyncEngine) -> Self {
        Self {
            engine,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of rows fetched per page (at least 1).
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Reconcile students, then courses, then enrollments.
    pub async fn reconcile_all<S>(&self, source: &S) -> ReconcileReport
    where
        S: RecordPages<Student> + RecordPages<Course> + RecordPages<Enrollment>,
    {
        tracing::info!(page_size = self.page_size, "Starting mirror reconciliation");

        let kinds = vec![
            self.reconcile_kind::<Student, S>(source).await,
            self.reconcile_kind::<Course, S>(source).await,
            self.reconcile_kind::<Enrollment, S>(source).await,
        ];
        let report = ReconcileReport { kinds };

        tracing::info!(
            projected = report.projected(),
            failed = report.failed(),
            clean = report.is_clean(),
            "Mirror reconciliation finished"
        );
        report
    }

    /// Reconcile every row of one entity kind.
    pub async fn reconcile_kind<R, S>(&self, source: &S) -> KindReport
    where
        R: Mirrored,
        S: RecordPages<R> + ?Sized,
    {
        let mut report = KindReport::new(R::KIND);
        let limit = i64::from(self.page_size);
        let full_page = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        let mut after = 0_i64;

        loop {
            let page = match RecordPages::<R>::page_after(source, after, limit).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(kind = %R::KIND, after, error = %e, "Failed to read page");
                    report.source_error = Some(e.to_string());
                    break;
                }
            };

            for record in &page {
                match self.engine.project(record).await {
                    Ok(Projection::Created) => report.created = report.created.saturating_add(1),
                    Ok(Projection::Updated) => report.updated = report.updated.saturating_add(1),
                    Err(e) => {
                        tracing::warn!(key = %e.key, error = %e.source, "Projection failed");
                        report.failures.push(ReconcileFailure {
                            key: e.key,
                            error: e.source.to_string(),
                        });
                    }
                }
            }

            match page.last() {
                Some(last) if page.len() >= full_page => after = last.record_id(),
                _ => break,
            }
        }

        tracing::info!(
            kind = %R::KIND,
            created = report.created,
            updated = report.updated,
            failed = report.failures.len(),
            "Reconciled entity kind"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use registrar_types::{CourseId, EnrollmentId, StudentId};
    use serde_json::json;

    use super::*;
    use crate::mirror::{MemoryMirror, MirrorStore};

    /// Rows held in memory, served in keyset pages like the record store.
    #[derive(Default)]
    struct Fixture {
        students: Vec<Student>,
        courses: Vec<Course>,
        enrollments: Vec<Enrollment>,
        fail_courses: bool,
        page_reads: AtomicUsize,
    }

    fn page<R: Mirrored + Clone>(rows: &[R], after: i64, limit: i64) -> Vec<R> {
        rows.iter()
            .filter(|r| r.record_id() > after)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect()
    }

    #[async_trait]
    impl RecordPages<Student> for Fixture {
        async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Student>, DbError> {
            self.page_reads.fetch_add(1, Ordering::SeqCst);
            Ok(page(&self.students, after, limit))
        }
    }

    #[async_trait]
    impl RecordPages<Course> for Fixture {
        async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Course>, DbError> {
            self.page_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_courses {
                return Err(DbError::Config(String::from("courses unreadable")));
            }
            Ok(page(&self.courses, after, limit))
        }
    }

    #[async_trait]
    impl RecordPages<Enrollment> for Fixture {
        async fn page_after(&self, after: i64, limit: i64) -> Result<Vec<Enrollment>, DbError> {
            self.page_reads.fetch_add(1, Ordering::SeqCst);
            Ok(page(&self.enrollments, after, limit))
        }
    }

    fn fixture(n: i64) -> Fixture {
        let day = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap_or_default();
        let students = (1..=n)
            .map(|i| Student {
                id: StudentId(i),
                last_name: format!("Nume{i}"),
                first_name: format!("Prenume{i}"),
                email: format!("s{i}@example.com"),
                birth_date: day,
            })
            .collect();
        let courses = (1..=n)
            .map(|i| Course {
                id: CourseId(i),
                title: format!("Curs {i}"),
                credits: 5,
                instructor: None,
            })
            .collect();
        let enrollments = (1..=n)
            .map(|i| Enrollment {
                id: EnrollmentId(i),
                student_id: StudentId(i),
                course_id: CourseId(i),
                enrolled_on: day,
                grade: Some(9.5),
            })
            .collect();
        Fixture {
            students,
            courses,
            enrollments,
            ..Fixture::default()
        }
    }

    fn engine() -> (Arc<MemoryMirror>, SyncEngine) {
        let mirror = Arc::new(MemoryMirror::new());
        let engine = SyncEngine::new(Arc::clone(&mirror) as Arc<dyn MirrorStore>);
        (mirror, engine)
    }

    #[tokio::test]
    async fn fills_an_empty_mirror_with_one_document_per_row() {
        let (mirror, engine) = engine();
        let rows = fixture(7);

        let report = Reconciler::new(&engine)
            .with_page_size(3)
            .reconcile_all(&rows)
            .await;

        assert!(report.is_clean());
        assert_eq!(report.projected(), 21);
        assert_eq!(mirror.len().await, 21);
        assert!(report.kinds.iter().all(|k| k.created == 7 && k.updated == 0));

        let key = MirrorKey::new(EntityKind::Enrollment, 5);
        let doc = mirror.fetch(&key).await.ok().flatten();
        assert_eq!(doc.as_ref().and_then(|d| d.fields.get("nota")), Some(&json!(9.5)));
        assert_eq!(doc.as_ref().and_then(|d| d.fields.get("curs_id")), Some(&json!(5)));
    }

    #[tokio::test]
    async fn rerun_updates_every_document_and_changes_nothing() {
        let (mirror, engine) = engine();
        let rows = fixture(4);
        let reconciler = Reconciler::new(&engine);

        let _ = reconciler.reconcile_all(&rows).await;
        let before = mirror.keys().await;

        let second = reconciler.reconcile_all(&rows).await;
        assert!(second.is_clean());
        assert!(second.kinds.iter().all(|k| k.created == 0 && k.updated == 4));
        assert_eq!(mirror.keys().await, before);
    }

    #[tokio::test]
    async fn walks_pages_in_id_order_until_a_short_page() {
        let (_mirror, engine) = engine();
        let rows = fixture(4);

        let report = Reconciler::new(&engine)
            .with_page_size(2)
            .reconcile_kind::<Student, _>(&rows)
            .await;

        assert_eq!(report.created, 4);
        // Two full pages, then an empty one ends the walk.
        assert_eq!(rows.page_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn mirror_outage_is_counted_per_row_and_reported() {
        let (mirror, engine) = engine();
        mirror.set_offline(true);
        let rows = fixture(2);

        let report = Reconciler::new(&engine).reconcile_all(&rows).await;

        assert_eq!(report.failed(), 6);
        assert_eq!(report.total(), 6);
        let first = report.kinds.first().and_then(|k| k.failures.first());
        assert_eq!(first.map(|f| f.key.as_str()), Some("student_1"));

        assert_eq!(
            report.into_result(),
            Err(ReconcileError::PartialFailure {
                failed: 6,
                total: 6,
                incomplete: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn unreadable_kind_does_not_stop_the_others() {
        let (mirror, engine) = engine();
        let rows = Fixture {
            fail_courses: true,
            ..fixture(3)
        };

        let report = Reconciler::new(&engine).reconcile_all(&rows).await;

        assert_eq!(report.projected(), 6);
        assert_eq!(mirror.len().await, 6);
        let courses = report.kinds.iter().find(|k| k.kind == EntityKind::Course);
        assert!(courses.is_some_and(|k| k.source_error.is_some()));

        assert!(matches!(
            report.into_result(),
            Err(ReconcileError::PartialFailure { failed: 0, incomplete, .. })
                if incomplete == vec![EntityKind::Course]
        ));
    }

    #[tokio::test]
    async fn empty_record_store_is_a_clean_no_op() {
        let (mirror, engine) = engine();
        let report = Reconciler::new(&engine)
            .reconcile_all(&Fixture::default())
            .await;

        assert!(report.is_clean());
        assert_eq!(report.total(), 0);
        assert!(mirror.is_empty().await);
        assert!(report.into_result().is_ok());
    }
}
