use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use outreach_core::{Effect, JobId};
use outreach_logging::{outreach_error, outreach_info, outreach_warn};
use tokio::sync::mpsc as async_mpsc;

use crate::backend::report_status;
use crate::export::export_results;
use crate::{
    Backend, BackendError, BackendSettings, ChangeFeed, ChangeNotifier, ChannelProgressSink,
    EngineEvent, ExportOptions, HttpChangeFeed, Poller, ProgressSink, ProspectSheet,
    ReqwestBackend, Survey, DEFAULT_POLL_INTERVAL,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub backend: BackendSettings,
    pub poll_interval: Duration,
    pub output_dir: PathBuf,
    pub export: ExportOptions,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            backend: BackendSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            output_dir,
            export: ExportOptions::default(),
        }
    }
}

/// The engine thread has exited; no further events will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("engine thread stopped")]
pub struct EngineStopped;

enum EngineCommand {
    StartJob {
        survey: Survey,
        prospects: ProspectSheet,
    },
    Effect(Effect),
}

/// Runs the async side of the application on its own thread.
///
/// Commands go in through [`EngineHandle::start_job`] and
/// [`EngineHandle::execute`]; results come back as [`EngineEvent`]s. Dropping
/// the handle stops the poller and the subscription.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, BackendError> {
        let backend = Arc::new(ReqwestBackend::new(config.backend.clone())?);
        let feed = Arc::new(HttpChangeFeed::new(config.backend.clone())?);
        Ok(Self::with_backend(config, backend, feed))
    }

    pub fn with_backend(
        config: EngineConfig,
        backend: Arc<dyn Backend>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    outreach_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let sink: Arc<dyn ProgressSink> = Arc::new(ChannelProgressSink::new(event_tx));
            runtime.block_on(run_engine(cmd_rx, config, backend, feed, sink));
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start_job(&self, survey: Survey, prospects: ProspectSheet) {
        self.send(EngineCommand::StartJob { survey, prospects });
    }

    pub fn execute(&self, effect: Effect) {
        self.send(EngineCommand::Effect(effect));
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        receive(&self.event_rx, timeout)
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            outreach_warn!("Engine thread is gone; command dropped");
        }
    }
}

fn receive(
    rx: &mpsc::Receiver<EngineEvent>,
    timeout: Duration,
) -> Result<Option<EngineEvent>, EngineStopped> {
    match rx.recv_timeout(timeout) {
        Ok(event) => Ok(Some(event)),
        Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineStopped),
    }
}

async fn run_engine(
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
    config: EngineConfig,
    backend: Arc<dyn Backend>,
    feed: Arc<dyn ChangeFeed>,
    sink: Arc<dyn ProgressSink>,
) {
    let mut poller = Poller::new(backend.clone(), sink.clone(), config.poll_interval);
    let mut notifier = ChangeNotifier::new(feed, backend.clone(), sink.clone());

    while let Some(command) = cmd_rx.recv().await {
        match command {
            EngineCommand::StartJob { survey, prospects } => {
                let backend = backend.clone();
                let sink = sink.clone();
                tokio::spawn(async move {
                    let total_count = prospects.total_count();
                    match backend.start_job(&survey, &prospects).await {
                        Ok(job_id) => {
                            outreach_info!("Job {} started with {} prospects", job_id, total_count);
                            sink.emit(EngineEvent::JobStarted {
                                job_id,
                                total_count,
                            });
                        }
                        Err(error) => {
                            outreach_warn!("Job submission failed: {}", error);
                            sink.emit(EngineEvent::JobStartFailed { error });
                        }
                    }
                });
            }
            EngineCommand::Effect(effect) => match effect {
                Effect::Subscribe { job_id } => notifier.subscribe(job_id),
                Effect::Unsubscribe => notifier.unsubscribe(),
                Effect::StartMonitoring { job_id } => poller.start_monitoring(job_id),
                Effect::StopMonitoring => poller.stop_monitoring(),
                Effect::RefreshProgress { job_id } => {
                    let backend = backend.clone();
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        let result = backend.check_progress(&job_id).await;
                        report_status(sink.as_ref(), &job_id, result);
                    });
                }
                Effect::ExportResults { job_id } => {
                    spawn_export(backend.clone(), sink.clone(), &config, job_id);
                }
            },
        }
    }
    outreach_info!("Engine command channel closed; shutting down");
}

fn spawn_export(
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    config: &EngineConfig,
    job_id: JobId,
) {
    let output_dir = config.output_dir.clone();
    let options = config.export.clone();
    tokio::spawn(async move {
        let result = export_results(backend.as_ref(), &job_id, &output_dir, &options)
            .await
            .map_err(|err| {
                outreach_warn!("Export for job {} failed: {}", job_id, err);
                err.to_string()
            });
        sink.emit(EngineEvent::ExportCompleted { job_id, result });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_tells_timeouts_from_a_stopped_engine() {
        let (tx, rx) = mpsc::channel();
        assert_eq!(receive(&rx, Duration::from_millis(5)), Ok(None));

        let event = EngineEvent::SubscriptionDropped {
            job_id: JobId::from("s-1"),
            reason: "closed".to_string(),
        };
        tx.send(event.clone()).unwrap();
        assert_eq!(receive(&rx, Duration::from_millis(5)), Ok(Some(event)));

        drop(tx);
        assert_eq!(receive(&rx, Duration::from_millis(5)), Err(EngineStopped));
    }
}
