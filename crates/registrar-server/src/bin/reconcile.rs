//! One-shot bulk reconciler binary.
//!
//! Re-projects every student, course and enrollment row into the mirror
//! store, then exits. Safe to run any number of times and safe to run while
//! `registrar-server` is serving: projection is an idempotent upsert keyed
//! by the derived mirror key.
//!
//! Exits non-zero when any row failed to project or any entity kind could
//! not be read completely.

use registrar_db::Reconciler;
use registrar_server::config::MirrorBackend;
use registrar_server::{RegistrarConfig, StartupError, logging, startup};
use tracing::info;

/// Entry point for `registrar-reconcile`.
///
/// # Errors
///
/// Returns an error if configuration or either store fails to open, or if
/// the run leaves the mirror incomplete.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistrarConfig::load(std::env::args().nth(1))?;
    logging::init(&config.logging);

    if config.mirror.backend == MirrorBackend::Memory {
        tracing::warn!("Reconciling into an in-memory mirror; results are discarded on exit");
    }

    let (records, sync) = startup::open_stores(&config).await?;

    let report = Reconciler::new(&sync)
        .with_page_size(config.reconcile.page_size)
        .reconcile_all(&records)
        .await;

    for kind in &report.kinds {
        info!(
            kind = %kind.kind,
            created = kind.created,
            updated = kind.updated,
            failed = kind.failed(),
            complete = kind.source_error.is_none(),
            "Kind reconciled"
        );
    }
    for failure in report.kinds.iter().flat_map(|k| &k.failures) {
        tracing::warn!(key = %failure.key, error = %failure.error, "Row not mirrored");
    }

    startup::close_stores(&records, &sync).await;

    report
        .into_result()
        .map_err(StartupError::from)?;
    info!("Mirror is up to date");
    Ok(())
}
