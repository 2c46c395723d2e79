use std::time::Duration;

use outreach_core::JobId;
use outreach_logging::{outreach_debug, outreach_warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    BackendError, EngineEvent, FailureKind, OutreachRecord, ProgressSnapshot, ProspectSheet,
    Survey,
};

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Base URL of the hosted functions, e.g. `https://example.supabase.co/functions/v1/`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321/functions/v1/".to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl BackendSettings {
    /// Resolves `name` against the base URL. A missing trailing slash on the
    /// base is tolerated so that the last path segment is not replaced.
    pub(crate) fn endpoint(&self, name: &str) -> Result<Url, BackendError> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|url| url.join(name))
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    pub(crate) fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => request
                .header("apikey", key)
                .header(AUTHORIZATION, format!("Bearer {key}")),
            _ => request,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// The hosted functions this application talks to.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Authoritative progress of a job.
    async fn check_progress(&self, job_id: &JobId) -> Result<ProgressSnapshot, BackendError>;

    /// Submits the survey with its prospect list and returns the new job id.
    async fn start_job(
        &self,
        survey: &Survey,
        prospects: &ProspectSheet,
    ) -> Result<JobId, BackendError>;

    /// Every processed record of a job.
    async fn fetch_results(&self, job_id: &JobId) -> Result<Vec<OutreachRecord>, BackendError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StartJobResponse {
    #[serde(rename = "jobId", alias = "surveyId")]
    job_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, BackendError> {
        let url = self.settings.endpoint(endpoint)?;
        let payload = serde_json::to_vec(&body)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))?;

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(payload);
        let response = self
            .settings
            .authorize(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let message = body
                .error
                .or(body.message)
                .unwrap_or_else(|| status.to_string());
            outreach_warn!("{} answered {}: {}", endpoint, status.as_u16(), message);
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn check_progress(&self, job_id: &JobId) -> Result<ProgressSnapshot, BackendError> {
        if job_id.is_empty() {
            return Err(BackendError::new(
                FailureKind::InvalidJobId,
                "job id is required",
            ));
        }
        let snapshot: ProgressSnapshot = self
            .post_json("check-progress", json!({ "jobId": job_id.as_str() }))
            .await?;
        outreach_debug!(
            "Job {} progress {}/{} complete={}",
            job_id,
            snapshot.processed_count,
            snapshot.total_count,
            snapshot.is_complete
        );
        Ok(snapshot)
    }

    async fn start_job(
        &self,
        survey: &Survey,
        prospects: &ProspectSheet,
    ) -> Result<JobId, BackendError> {
        let body = json!({
            "survey": {
                "audience": survey.audience,
                "industry": survey.industry,
                "tone": survey.tone,
                "goal": survey.goal,
                "senderName": survey.sender_name,
                "extraNotes": survey.extra_notes,
            },
            "prospects": prospects.rows().iter().map(|row| row.fields()).collect::<Vec<_>>(),
        });
        let response: StartJobResponse = self.post_json("start-job", body).await?;
        let job_id = JobId::new(response.job_id);
        if job_id.is_empty() {
            return Err(BackendError::new(
                FailureKind::Decode,
                "backend returned an empty job id",
            ));
        }
        Ok(job_id)
    }

    async fn fetch_results(&self, job_id: &JobId) -> Result<Vec<OutreachRecord>, BackendError> {
        if job_id.is_empty() {
            return Err(BackendError::new(
                FailureKind::InvalidJobId,
                "job id is required",
            ));
        }
        self.post_json("export-results", json!({ "jobId": job_id.as_str() }))
            .await
    }
}

/// Forwards the outcome of one status query to the sink.
pub(crate) fn report_status(
    sink: &dyn ProgressSink,
    job_id: &JobId,
    result: Result<ProgressSnapshot, BackendError>,
) {
    match result {
        Ok(snapshot) => sink.emit(EngineEvent::Progress {
            job_id: job_id.clone(),
            snapshot,
        }),
        Err(error) if error.is_rejection() => {
            outreach_warn!("Status check for job {} rejected: {}", job_id, error);
            sink.emit(EngineEvent::JobRejected {
                job_id: job_id.clone(),
                error,
            });
        }
        Err(error) => {
            outreach_warn!("Status check for job {} failed: {}", job_id, error);
            sink.emit(EngineEvent::TransportError {
                job_id: job_id.clone(),
                error,
            });
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return BackendError::new(FailureKind::Decode, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
