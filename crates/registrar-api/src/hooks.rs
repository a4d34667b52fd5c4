//! Post-commit hooks connecting handlers to the sync engine.
//!
//! Each hook runs strictly after the relational write has committed. The
//! sync result is logged and dropped: a mirror outage never turns into an
//! HTTP error, because the record store is already correct and the bulk
//! reconciler can rebuild the mirror from it.
//!
//! The sync work runs on a spawned task that owns clones of the engine and
//! the row. The handler awaits it, but a client disconnect that drops the
//! handler future after the commit does not cancel the mirror write.

use registrar_db::{SyncEngine, log_projection, log_retraction};
use registrar_types::{EntityKind, EnrollmentId, MirrorKey, Mirrored};

/// Project a newly inserted row.
pub async fn on_created<R>(sync: &SyncEngine, record: &R)
where
    R: Mirrored + Clone + 'static,
{
    project_detached(sync, record).await;
}

/// Re-project an updated row.
pub async fn on_updated<R>(sync: &SyncEngine, record: &R)
where
    R: Mirrored + Clone + 'static,
{
    project_detached(sync, record).await;
}

/// Retract a deleted row and every enrollment its delete cascaded to.
pub async fn on_deleted(
    sync: &SyncEngine,
    kind: EntityKind,
    record_id: i64,
    cascaded: Vec<EnrollmentId>,
) {
    let sync = sync.clone();
    let task = tokio::spawn(async move {
        retract_one(&sync, kind, record_id).await;
        for enrollment in &cascaded {
            retract_one(&sync, EntityKind::Enrollment, enrollment.into_inner()).await;
        }
        if !cascaded.is_empty() {
            tracing::info!(
                %kind,
                record_id,
                enrollments = cascaded.len(),
                "Retracted cascaded enrollments"
            );
        }
    });
    join(task, &MirrorKey::new(kind, record_id)).await;
}

/// Run the projection on its own task so it completes even if the request
/// future is dropped after the commit.
async fn project_detached<R>(sync: &SyncEngine, record: &R)
where
    R: Mirrored + Clone + 'static,
{
    let key = record.mirror_key();
    let sync = sync.clone();
    let record = record.clone();
    let task_key = key.clone();
    let task = tokio::spawn(async move {
        log_projection(&task_key, &sync.project(&record).await);
    });
    join(task, &key).await;
}

async fn join(task: tokio::task::JoinHandle<()>, key: &MirrorKey) {
    if let Err(e) = task.await {
        tracing::error!(key = %key, error = %e, "Mirror sync task failed");
    }
}

async fn retract_one(sync: &SyncEngine, kind: EntityKind, record_id: i64) {
    let outcome = sync.retract(kind, record_id).await;
    log_retraction(&MirrorKey::new(kind, record_id), &outcome);
}
