use std::fmt;

use outreach_core::JobId;
use serde::Deserialize;

use crate::ExportSummary;

/// Body of a successful status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub processed_count: u64,
    pub total_count: u64,
    pub is_complete: bool,
}

/// One generated outreach message as returned by the export endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutreachRecord {
    pub first_name: String,
    pub job_title: String,
    pub company: String,
    pub email: String,
    pub copy: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    JobStarted { job_id: JobId, total_count: u64 },
    JobStartFailed { error: BackendError },
    Progress { job_id: JobId, snapshot: ProgressSnapshot },
    TransportError { job_id: JobId, error: BackendError },
    JobRejected { job_id: JobId, error: BackendError },
    SubscriptionDropped { job_id: JobId, reason: String },
    ExportCompleted {
        job_id: JobId,
        result: Result<ExportSummary, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The service understood the request and refused it for this job.
    /// Anything else is treated as a transient transport failure.
    pub fn is_rejection(&self) -> bool {
        match self.kind {
            FailureKind::InvalidJobId => true,
            FailureKind::HttpStatus(code) => {
                (400..500).contains(&code) && code != 408 && code != 429
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidJobId,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidJobId => write!(f, "invalid job id"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_rejections_except_retryable_ones() {
        assert!(BackendError::new(FailureKind::HttpStatus(404), "").is_rejection());
        assert!(BackendError::new(FailureKind::InvalidJobId, "").is_rejection());
        assert!(!BackendError::new(FailureKind::HttpStatus(429), "").is_rejection());
        assert!(!BackendError::new(FailureKind::HttpStatus(503), "").is_rejection());
        assert!(!BackendError::new(FailureKind::Timeout, "").is_rejection());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = BackendError::new(FailureKind::HttpStatus(400), "surveyId is required");
        assert_eq!(err.to_string(), "http status 400: surveyId is required");
    }
}
