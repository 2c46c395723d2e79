use std::fmt;

/// Opaque job identifier handed out by the backend (the survey id).
///
/// An empty id stands for "no active job".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    /// No further updates are applied in a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    /// Row count of the uploaded prospect list; fixed for the job's lifetime.
    pub total_count: u64,
    /// Highest count reported so far. May exceed `total_count`; views clamp it.
    pub processed_count: u64,
    pub status: JobStatus,
    pub last_error: Option<String>,
}

impl JobProgress {
    pub(crate) fn new(job_id: JobId, total_count: u64) -> Self {
        Self {
            job_id,
            total_count,
            processed_count: 0,
            status: JobStatus::Pending,
            last_error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }
}
