use std::path::PathBuf;

use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The backend accepted a job built from an uploaded prospect list.
    JobCreated { job_id: JobId, total_count: u64 },
    /// Authoritative count read from the status endpoint.
    ProgressReported {
        job_id: JobId,
        processed_count: u64,
        is_complete: bool,
    },
    /// Status request failed in transit; the next tick will try again.
    TransportFailed { job_id: JobId, message: String },
    /// The service answered with an error for this job id.
    JobRejected { job_id: JobId, message: String },
    /// The push channel ended.
    SubscriptionDropped { job_id: JobId },
    /// User asked for a manual refresh.
    RefreshClicked,
    /// User asked to download the results.
    DownloadClicked,
    /// Engine finished (or failed) writing the export.
    ExportFinished { job_id: JobId, result: ExportOutcome },
    /// User switched away from the current job.
    ResetClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

pub type ExportOutcome = Result<ExportedFile, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub record_count: usize,
}
