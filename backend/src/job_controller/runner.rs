//! Runs a spreadsheet import in the background.
//!
//! `schedule_ingest_job` claims the single job slot and returns at once. A
//! supervising Tokio task then runs the pipeline on the blocking pool,
//! removes the staged file, and reports the terminal outcome through the same
//! channel as the progress updates, so it is always applied last.

use super::state::{JobEvent, JobRejected, JobStateStore, JobUpdate};
use crate::config::IngestSettings;
use crate::ingest::{ingest_file, IngestError, IngestEvent, IngestSummary};
use crate::store::OfferSink;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Starts importing `path` into `sink` unless an import is already running.
///
/// On rejection nothing is spawned and the file is left for the caller.
pub async fn schedule_ingest_job(
    jobs: &JobStateStore,
    sink: Arc<dyn OfferSink>,
    path: PathBuf,
    settings: IngestSettings,
) -> Result<String, JobRejected> {
    let job_id = jobs.try_start().await?;
    info!("import {} started for {}", job_id, path.display());

    let tx = jobs.tx.clone();
    let value = job_id.clone();

    tokio::spawn(async move {
        let tx_block = tx.clone();
        let job_for_blocking = value.clone();
        let path_for_blocking = path.clone();

        let handle = tokio::task::spawn_blocking(move || {
            ingest_blocking(
                &tx_block,
                &job_for_blocking,
                &path_for_blocking,
                settings,
                sink.as_ref(),
            )
        });

        let event = match handle.await {
            Ok(Ok(summary)) => JobEvent::Completed {
                saved: summary.saved,
                skipped: summary.skipped,
            },
            Ok(Err(e)) => {
                error!("import {} failed: {}", value, e);
                JobEvent::Failed(e.to_string())
            }
            Err(join_err) => {
                error!("import {} panicked: {}", value, join_err);
                JobEvent::Failed(format!("import task join error: {}", join_err))
            }
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("removed staged file {}", path.display()),
            Err(e) => warn!("could not remove staged file {}: {}", path.display(), e),
        }

        let _ = tx
            .send(JobUpdate {
                job_id: value,
                event,
            })
            .await;
    });

    Ok(job_id)
}

fn ingest_blocking(
    tx: &mpsc::Sender<JobUpdate>,
    job_id: &str,
    path: &Path,
    settings: IngestSettings,
    sink: &dyn OfferSink,
) -> Result<IngestSummary, IngestError> {
    let start = Instant::now();
    let mut report = |event: IngestEvent| {
        let event = match event {
            IngestEvent::SizeHint(rows) => JobEvent::Total(rows),
            IngestEvent::Progress {
                progress,
                saved,
                skipped,
            } => JobEvent::Progress {
                progress,
                saved,
                skipped,
            },
        };
        let _ = tx.blocking_send(JobUpdate {
            job_id: job_id.to_string(),
            event,
        });
    };
    let result = ingest_file(path, settings, sink, &mut report);
    info!("import {} ran for {:.2?}", job_id, start.elapsed());
    result
}
