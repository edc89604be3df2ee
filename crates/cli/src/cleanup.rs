//! Post-batch removal of converted sources.

use rulebatch_core::{Worker, WorkerState};
use tracing::{info, warn};

/// Removes the source file of every worker that converted successfully.
///
/// Dry-run workers and failed workers keep their sources. Removal errors are
/// logged and do not change the batch result. Returns the number removed.
pub async fn remove_converted_sources(workers: &[Worker]) -> usize {
    let mut removed = 0;

    for worker in workers {
        if worker.is_dry_run() || worker.state() != WorkerState::Succeeded {
            continue;
        }

        let source = worker.job().source();
        match tokio::fs::remove_file(source).await {
            Ok(()) => {
                info!("Removed source {}", source.display());
                removed += 1;
            }
            Err(e) => {
                warn!("Failed to remove source file {}: {}", source.display(), e);
            }
        }
    }

    removed
}
