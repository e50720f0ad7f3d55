use serde::{Deserialize, Serialize};

/// Where the ingestion job is in its lifecycle.
///
/// `Running` is entered only from a non-running phase; there is never more
/// than one running job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Snapshot of the current (or last) spreadsheet import, as served to pollers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJobState {
    pub job_id: Option<String>,
    pub phase: JobPhase,
    pub is_processing: bool,
    /// Rows converted into records so far.
    pub progress: u64,
    /// Best-effort row count; final persisted count once the job completes.
    pub total: u64,
    /// Records committed to storage.
    pub saved: u64,
    /// Rows dropped by normalisation.
    pub skipped: u64,
    pub error: Option<String>,
}

impl IngestionJobState {
    /// Fresh state for a job that has just been claimed.
    pub fn running(job_id: String) -> Self {
        IngestionJobState {
            job_id: Some(job_id),
            phase: JobPhase::Running,
            is_processing: true,
            ..Default::default()
        }
    }
}
