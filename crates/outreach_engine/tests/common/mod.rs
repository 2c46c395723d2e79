#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use outreach_core::JobId;
use outreach_engine::{
    Backend, BackendError, ChangeFeed, EngineEvent, FailureKind, FeedError, InsertNotice,
    NoticeStream, OutreachRecord, ProgressSink, ProgressSnapshot, ProspectSheet, Survey,
};
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
pub struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_counts(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Progress { snapshot, .. } => Some(snapshot.processed_count),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn snapshot(processed_count: u64, total_count: u64) -> ProgressSnapshot {
    ProgressSnapshot {
        processed_count,
        total_count,
        is_complete: processed_count >= total_count,
    }
}

pub fn failure(kind: FailureKind) -> BackendError {
    BackendError {
        kind,
        message: "scripted failure".to_string(),
    }
}

/// Answers status queries from a script, repeating the last answer once it runs out.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ProgressSnapshot, BackendError>>>,
    last: Mutex<Option<Result<ProgressSnapshot, BackendError>>>,
    calls: Mutex<Vec<JobId>>,
    pub job_id: JobId,
    pub records: Vec<OutreachRecord>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<ProgressSnapshot, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            job_id: JobId::from("job-1"),
            records: Vec::new(),
        })
    }

    pub fn counts(total: u64, counts: &[u64]) -> Arc<Self> {
        Self::new(counts.iter().map(|&c| Ok(snapshot(c, total))).collect())
    }

    pub fn with_records(records: Vec<OutreachRecord>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            job_id: JobId::from("job-1"),
            records,
        })
    }

    pub fn calls(&self) -> Vec<JobId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn check_progress(&self, job_id: &JobId) -> Result<ProgressSnapshot, BackendError> {
        self.calls.lock().unwrap().push(job_id.clone());
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(answer) => {
                *last = Some(answer.clone());
                answer
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(failure(FailureKind::Network))),
        }
    }

    async fn start_job(
        &self,
        _survey: &Survey,
        _prospects: &ProspectSheet,
    ) -> Result<JobId, BackendError> {
        Ok(self.job_id.clone())
    }

    async fn fetch_results(&self, _job_id: &JobId) -> Result<Vec<OutreachRecord>, BackendError> {
        Ok(self.records.clone())
    }
}

/// Feed whose notices are pushed by the test through an unbounded channel.
pub struct ChannelFeed {
    rx: Mutex<Option<mpsc::UnboundedReceiver<InsertNotice>>>,
}

impl ChannelFeed {
    pub fn new() -> (mpsc::UnboundedSender<InsertNotice>, Arc<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Arc::new(Self {
                rx: Mutex::new(Some(rx)),
            }),
        )
    }
}

#[async_trait::async_trait]
impl ChangeFeed for ChannelFeed {
    async fn subscribe(&self, _job_id: &JobId) -> Result<NoticeStream, FeedError> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| FeedError::Stream("already subscribed".to_string()))?;
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|notice| (Ok(notice), rx))
        })
        .boxed())
    }
}

/// Feed whose streams never yield and record when they are dropped.
#[derive(Default)]
pub struct IdleFeed {
    dropped: Mutex<Vec<(JobId, Arc<AtomicBool>)>>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl IdleFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(job id, stream dropped)` per subscription, in subscription order.
    pub fn subscriptions(&self) -> Vec<(JobId, bool)> {
        self.dropped
            .lock()
            .unwrap()
            .iter()
            .map(|(job, flag)| (job.clone(), flag.load(Ordering::SeqCst)))
            .collect()
    }
}

#[async_trait::async_trait]
impl ChangeFeed for IdleFeed {
    async fn subscribe(&self, job_id: &JobId) -> Result<NoticeStream, FeedError> {
        let flag = Arc::new(AtomicBool::new(false));
        self.dropped
            .lock()
            .unwrap()
            .push((job_id.clone(), flag.clone()));
        let guard = DropFlag(flag);
        Ok(stream::unfold(guard, |guard| async move {
            futures_util::future::pending::<()>().await;
            Some((
                Err(FeedError::Stream("unreachable".to_string())),
                guard,
            ))
        })
        .boxed())
    }
}

/// Feed whose `subscribe` does not return until the test calls [`SlowFeed::connect`].
#[derive(Default)]
pub struct SlowFeed {
    gate: Notify,
}

impl SlowFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl ChangeFeed for SlowFeed {
    async fn subscribe(&self, _job_id: &JobId) -> Result<NoticeStream, FeedError> {
        self.gate.notified().await;
        Ok(stream::pending::<Result<InsertNotice, FeedError>>().boxed())
    }
}

pub fn notice(job_id: &str) -> InsertNotice {
    InsertNotice {
        job_id: JobId::from(job_id),
        record_id: None,
    }
}

/// Polls `condition` every 10 ms for up to two seconds of (possibly paused) time.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
