use crate::{JobId, JobProgress, JobStatus};

/// Single source of truth for the active job's progress.
///
/// Counts only move forward: notifications and poll responses can arrive out
/// of order, so a lower count than the stored one is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressStore {
    job: Option<JobProgress>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `job_id`. An empty id means "no active job" and is a no-op.
    pub fn initialize(&mut self, job_id: JobId, total_count: u64) -> bool {
        if job_id.is_empty() {
            return false;
        }
        self.job = Some(JobProgress::new(job_id, total_count));
        // Nothing to process: vacuously complete.
        self.mark_complete();
        true
    }

    /// Records a reported processed count. Returns whether the stored job changed.
    pub fn apply_update(&mut self, processed_count: u64) -> bool {
        let Some(job) = self.job.as_mut() else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }

        let mut changed = false;
        if processed_count > job.processed_count {
            job.processed_count = processed_count;
            changed = true;
        }
        if job.status == JobStatus::Pending && job.processed_count > 0 {
            job.status = JobStatus::Processing;
            changed = true;
        }
        self.mark_complete() || changed
    }

    /// Moves the job to `Complete` once every row is processed. Idempotent.
    pub fn mark_complete(&mut self) -> bool {
        match self.job.as_mut() {
            Some(job)
                if job.status != JobStatus::Complete
                    && job.processed_count >= job.total_count =>
            {
                job.status = JobStatus::Complete;
                job.last_error = None;
                true
            }
            _ => false,
        }
    }

    /// Marks the job as rejected by the service.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        match self.job.as_mut() {
            Some(job) if !job.is_complete() => {
                job.status = JobStatus::Error;
                job.last_error = Some(message.into());
                true
            }
            _ => false,
        }
    }

    /// Leaves the `Error` status so that a user-initiated retry can apply updates again.
    pub fn clear_error(&mut self) -> bool {
        match self.job.as_mut() {
            Some(job) if job.status == JobStatus::Error => {
                job.status = if job.processed_count > 0 {
                    JobStatus::Processing
                } else {
                    JobStatus::Pending
                };
                job.last_error = None;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.job = None;
    }

    pub fn job(&self) -> Option<&JobProgress> {
        self.job.as_ref()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.job_id)
    }

    /// True when `job_id` names the job currently tracked. Used to discard stale responses.
    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.job_id() == Some(job_id)
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|job| job.status)
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Some(JobStatus::Complete)
    }
}
