//! Shared state of the spreadsheet import job.
//!
//! There is a single job slot for the whole process:
//! - `JobStateStore`: clonable handle injected into the Actix application in
//!   `main.rs`. Claiming the slot (`try_start`) is a check-and-set under one
//!   write lock, so two uploads can never both start a job.
//! - `JobUpdate`: message sent by the running job to report progress or its
//!   terminal outcome.
//! - `start_job_updater`: long-running task applying `JobUpdate`s in order.
//!   Updates tagged with another job's id are dropped.

use common::jobs::{IngestionJobState, JobPhase};
use log::debug;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Change reported by a running job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobEvent {
    /// Expected number of data rows, header excluded.
    Total(u64),
    /// Rows processed so far, records stored and rows skipped.
    Progress { progress: u64, saved: u64, skipped: u64 },
    /// Final counts; the job is no longer processing.
    Completed { saved: u64, skipped: u64 },
    /// Error message shown to the poller; counts keep their last values.
    Failed(String),
}

/// Message sent from a running job to the updater task.
#[derive(Debug)]
pub struct JobUpdate {
    /// Job the event belongs to. Events for any other job are dropped.
    pub(crate) job_id: String,
    pub(crate) event: JobEvent,
}

/// The start request was refused because a job is already running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRejected {
    /// Id of the job holding the slot, if it has one yet.
    pub running_job: Option<String>,
}

/// Single-flight guard and progress record for spreadsheet imports.
#[derive(Clone)]
pub struct JobStateStore {
    /// Snapshot served to pollers; written only by `try_start` and the updater.
    state: Arc<RwLock<IngestionJobState>>,
    /// Sender handed to the running job; drained by `start_job_updater`.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobStateStore {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            JobStateStore {
                state: Arc::new(RwLock::new(IngestionJobState::default())),
                tx,
            },
            rx,
        )
    }

    /// Claims the job slot and resets the counters. Leaves the state untouched
    /// when a job is already running.
    pub async fn try_start(&self) -> Result<String, JobRejected> {
        let mut state = self.state.write().await;
        if state.is_processing {
            return Err(JobRejected {
                running_job: state.job_id.clone(),
            });
        }
        let job_id = uuid::Uuid::new_v4().to_string();
        *state = IngestionJobState::running(job_id.clone());
        Ok(job_id)
    }

    pub async fn snapshot(&self) -> IngestionJobState {
        self.state.read().await.clone()
    }

    pub async fn is_processing(&self) -> bool {
        self.state.read().await.is_processing
    }

    pub async fn update(&self, update: JobUpdate) {
        let mut state = self.state.write().await;
        if state.job_id.as_deref() != Some(update.job_id.as_str()) || !state.is_processing {
            debug!("dropping stale update for job {}", update.job_id);
            return;
        }
        match update.event {
            JobEvent::Total(total) => state.total = total,
            JobEvent::Progress {
                progress,
                saved,
                skipped,
            } => {
                state.progress = progress;
                state.saved = saved;
                state.skipped = skipped;
                state.total = state.total.max(progress + skipped);
            }
            JobEvent::Completed { saved, skipped } => {
                state.phase = JobPhase::Completed;
                state.is_processing = false;
                state.progress = saved;
                state.saved = saved;
                state.total = saved;
                state.skipped = skipped;
                state.error = None;
            }
            JobEvent::Failed(message) => {
                state.phase = JobPhase::Failed;
                state.is_processing = false;
                state.error = Some(message);
            }
        }
    }
}

/// Applies every `JobUpdate` received on `rx`, in order.
///
/// Spawned once in `main.rs`; `JobStateStore` keeps a sender alive, so this
/// runs for the lifetime of the server.
pub async fn start_job_updater(state: JobStateStore, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        state.update(update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(job_id: &str, event: JobEvent) -> JobUpdate {
        JobUpdate {
            job_id: job_id.to_string(),
            event,
        }
    }

    #[actix_web::test]
    async fn second_start_is_rejected_without_touching_state() {
        let (store, _rx) = JobStateStore::new(8);
        let job = store.try_start().await.unwrap();
        store
            .update(update(
                &job,
                JobEvent::Progress {
                    progress: 10,
                    saved: 5,
                    skipped: 1,
                },
            ))
            .await;
        let before = store.snapshot().await;

        let rejected = store.try_start().await.unwrap_err();
        assert_eq!(rejected.running_job.as_deref(), Some(job.as_str()));
        assert_eq!(store.snapshot().await, before);
        assert_eq!(before.saved, 5);
        assert!(before.is_processing);
    }

    #[actix_web::test]
    async fn completion_frees_the_slot_and_resets_next_run() {
        let (store, _rx) = JobStateStore::new(8);
        let first = store.try_start().await.unwrap();
        store
            .update(update(&first, JobEvent::Completed { saved: 7, skipped: 2 }))
            .await;
        let done = store.snapshot().await;
        assert_eq!(done.phase, JobPhase::Completed);
        assert!(!done.is_processing);
        assert_eq!((done.saved, done.total, done.skipped), (7, 7, 2));

        let second = store.try_start().await.unwrap();
        assert_ne!(first, second);
        let fresh = store.snapshot().await;
        assert_eq!(fresh.saved, 0);
        assert_eq!(fresh.phase, JobPhase::Running);
    }

    #[actix_web::test]
    async fn failure_keeps_committed_counts() {
        let (store, _rx) = JobStateStore::new(8);
        let job = store.try_start().await.unwrap();
        store
            .update(update(
                &job,
                JobEvent::Progress {
                    progress: 4,
                    saved: 2,
                    skipped: 0,
                },
            ))
            .await;
        store
            .update(update(&job, JobEvent::Failed("disk full".into())))
            .await;
        let failed = store.snapshot().await;
        assert_eq!(failed.phase, JobPhase::Failed);
        assert_eq!(failed.error.as_deref(), Some("disk full"));
        assert_eq!(failed.saved, 2);
        assert!(!failed.is_processing);
    }

    #[actix_web::test]
    async fn updates_for_other_jobs_are_ignored() {
        let (store, rx) = JobStateStore::new(8);
        let updater = tokio::spawn(start_job_updater(store.clone(), rx));
        let job = store.try_start().await.unwrap();
        store
            .tx
            .send(update("someone-else", JobEvent::Failed("boom".into())))
            .await
            .unwrap();
        store
            .tx
            .send(update(&job, JobEvent::Total(40)))
            .await
            .unwrap();

        // Wait for the updater to catch up.
        for _ in 0..50 {
            if store.snapshot().await.total == 40 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let state = store.snapshot().await;
        assert_eq!(state.total, 40);
        assert!(state.error.is_none());
        assert!(state.is_processing);
        updater.abort();
    }
}
