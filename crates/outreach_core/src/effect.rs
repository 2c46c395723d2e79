use crate::JobId;

/// Side effects requested by [`crate::update`], executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the change subscription for a job.
    Subscribe { job_id: JobId },
    /// Close the current change subscription.
    Unsubscribe,
    /// Start the periodic status poll for a job.
    StartMonitoring { job_id: JobId },
    /// Cancel the periodic status poll.
    StopMonitoring,
    /// One-shot status query.
    RefreshProgress { job_id: JobId },
    /// Download the processed records and write them as CSV.
    ExportResults { job_id: JobId },
}
