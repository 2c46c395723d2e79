use std::sync::Arc;

use bytes::BytesMut;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use outreach_core::JobId;
use outreach_logging::{outreach_debug, outreach_info, outreach_trace, outreach_warn};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::backend::{map_reqwest_error, report_status};
use crate::{Backend, BackendError, BackendSettings, EngineEvent, FailureKind, ProgressSink};

/// "A processed record was inserted for this job."
///
/// One notice may stand for a batch of inserts, so it carries no count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertNotice {
    pub job_id: JobId,
    pub record_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("subscription request failed: {0}")]
    Connect(#[from] BackendError),
    #[error("subscription stream failed: {0}")]
    Stream(String),
    #[error("malformed notice: {0}")]
    Decode(String),
}

impl FeedError {
    /// A bad line does not end the subscription; a broken stream does.
    pub fn ends_subscription(&self) -> bool {
        !matches!(self, FeedError::Decode(_))
    }
}

pub type NoticeStream = BoxStream<'static, Result<InsertNotice, FeedError>>;

/// Source of insert notices for a single job.
#[async_trait::async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, job_id: &JobId) -> Result<NoticeStream, FeedError>;
}

/// Change feed served as newline-delimited JSON over a long-lived GET.
///
/// Each line looks like `{"jobId": "...", "recordId": 17}`. Blank lines and
/// lines starting with `:` are keep-alives.
#[derive(Debug, Clone)]
pub struct HttpChangeFeed {
    settings: BackendSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WireNotice {
    #[serde(rename = "jobId", alias = "surveyId")]
    job_id: String,
    #[serde(default, rename = "recordId")]
    record_id: Option<serde_json::Value>,
}

impl HttpChangeFeed {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        // No overall request timeout: the response body stays open for the job's lifetime.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl ChangeFeed for HttpChangeFeed {
    async fn subscribe(&self, job_id: &JobId) -> Result<NoticeStream, FeedError> {
        let mut url = self.settings.endpoint("changes")?;
        url.query_pairs_mut().append_pair("jobId", job_id.as_str());

        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/x-ndjson");
        let response = self
            .settings
            .authorize(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Connect(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            )));
        }

        let wanted = job_id.clone();
        let chunks = response.bytes_stream().boxed();
        let notices = stream::unfold(
            (chunks, BytesMut::new(), false),
            move |(mut chunks, mut buffer, mut finished)| {
                let wanted = wanted.clone();
                async move {
                    loop {
                        if let Some(line) = take_line(&mut buffer) {
                            match parse_notice(&line) {
                                Ok(Some(notice)) if notice.job_id == wanted => {
                                    return Some((Ok(notice), (chunks, buffer, finished)));
                                }
                                Ok(_) => continue,
                                Err(err) => return Some((Err(err), (chunks, buffer, finished))),
                            }
                        }
                        if finished {
                            return None;
                        }
                        match chunks.next().await {
                            Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                            Some(Err(err)) => {
                                buffer.clear();
                                return Some((
                                    Err(FeedError::Stream(err.to_string())),
                                    (chunks, buffer, true),
                                ));
                            }
                            None => {
                                finished = true;
                                if !buffer.is_empty() {
                                    buffer.extend_from_slice(b"\n");
                                }
                            }
                        }
                    }
                }
            },
        );
        Ok(notices.boxed())
    }
}

fn take_line(buffer: &mut BytesMut) -> Option<BytesMut> {
    let end = buffer.iter().position(|&b| b == b'\n')?;
    Some(buffer.split_to(end + 1))
}

fn parse_notice(line: &[u8]) -> Result<Option<InsertNotice>, FeedError> {
    let line = line.trim_ascii();
    if line.is_empty() || line.starts_with(b":") {
        return Ok(None);
    }
    let wire: WireNotice =
        serde_json::from_slice(line).map_err(|err| FeedError::Decode(err.to_string()))?;
    let record_id = wire.record_id.map(|value| match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    });
    Ok(Some(InsertNotice {
        job_id: JobId::new(wire.job_id),
        record_id,
    }))
}

/// Keeps one change subscription open for the active job.
///
/// The count is read once when the stream goes live and again on every
/// notice; it is never derived from the notices themselves. When the stream
/// ends the notifier reports [`EngineEvent::SubscriptionDropped`] and does
/// not reconnect. Must be used from within a tokio runtime.
pub struct ChangeNotifier {
    feed: Arc<dyn ChangeFeed>,
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    active: Option<ActiveSubscription>,
}

struct ActiveSubscription {
    job_id: JobId,
    cancel: CancellationToken,
}

impl ChangeNotifier {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            feed,
            backend,
            sink,
            active: None,
        }
    }

    pub fn subscribe(&mut self, job_id: JobId) {
        self.unsubscribe();
        if job_id.is_empty() {
            return;
        }

        let cancel = CancellationToken::new();
        tokio::spawn(run_subscription(
            self.feed.clone(),
            self.backend.clone(),
            self.sink.clone(),
            job_id.clone(),
            cancel.clone(),
        ));
        self.active = Some(ActiveSubscription { job_id, cancel });
    }

    pub fn unsubscribe(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            outreach_info!("Unsubscribed from job {}", active.job_id);
        }
    }

    pub fn subscribed_job(&self) -> Option<&JobId> {
        self.active.as_ref().map(|active| &active.job_id)
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn run_subscription(
    feed: Arc<dyn ChangeFeed>,
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    job_id: JobId,
    cancel: CancellationToken,
) {
    let subscribed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = feed.subscribe(&job_id) => result,
    };
    let mut notices = match subscribed {
        Ok(notices) => notices,
        Err(err) => {
            outreach_warn!("Could not subscribe to job {}: {}", job_id, err);
            sink.emit(EngineEvent::SubscriptionDropped {
                job_id,
                reason: err.to_string(),
            });
            return;
        }
    };
    outreach_info!("Subscribed to inserts for job {}", job_id);

    // Rows inserted before the stream went live produced no notice.
    let initial = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = backend.check_progress(&job_id) => result,
    };
    report_status(sink.as_ref(), &job_id, initial);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outreach_debug!("Subscription for job {} cancelled", job_id);
                return;
            }
            next = notices.next() => next,
        };
        let reason = match next {
            Some(Ok(notice)) => {
                outreach_trace!(
                    "Insert notice for job {} (record {:?})",
                    job_id,
                    notice.record_id
                );
                let result = backend.check_progress(&job_id).await;
                report_status(sink.as_ref(), &job_id, result);
                continue;
            }
            Some(Err(err)) if !err.ends_subscription() => {
                outreach_warn!("Ignoring notice for job {}: {}", job_id, err);
                continue;
            }
            Some(Err(err)) => err.to_string(),
            None => "channel closed".to_string(),
        };
        outreach_warn!("Subscription for job {} dropped: {}", job_id, reason);
        sink.emit(EngineEvent::SubscriptionDropped { job_id, reason });
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_splits_on_newline_only() {
        let mut buffer = BytesMut::from(&b"{\"a\":1}\n{\"b\""[..]);
        let line = take_line(&mut buffer).unwrap();
        assert_eq!(&line[..], b"{\"a\":1}\n");
        assert!(take_line(&mut buffer).is_none());
        assert_eq!(&buffer[..], b"{\"b\"");
    }

    #[test]
    fn keep_alive_lines_are_skipped() {
        assert_eq!(parse_notice(b"\r\n").unwrap(), None);
        assert_eq!(parse_notice(b": ping\n").unwrap(), None);
    }

    #[test]
    fn numeric_record_ids_are_stringified() {
        let notice = parse_notice(br#"{"jobId":"s-1","recordId":17}"#)
            .unwrap()
            .unwrap();
        assert_eq!(notice.job_id, JobId::from("s-1"));
        assert_eq!(notice.record_id.as_deref(), Some("17"));
    }

    #[test]
    fn garbage_does_not_end_the_subscription() {
        let err = parse_notice(b"not json").unwrap_err();
        assert!(!err.ends_subscription());
        assert!(FeedError::Stream("reset".into()).ends_subscription());
    }
}
