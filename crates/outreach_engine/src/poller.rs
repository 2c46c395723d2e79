use std::sync::Arc;
use std::time::Duration;

use outreach_core::JobId;
use outreach_logging::{outreach_debug, outreach_info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::report_status;
use crate::{Backend, ProgressSink};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic status requests for the job being monitored.
///
/// At most one interval runs per poller; starting a new one cancels the old
/// one first. Requests already in flight are not cancelled, their results are
/// still reported and the store drops them if they are stale. Must be used
/// from within a tokio runtime.
pub struct Poller {
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    active: Option<ActiveInterval>,
}

struct ActiveInterval {
    job_id: JobId,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(backend: Arc<dyn Backend>, sink: Arc<dyn ProgressSink>, interval: Duration) -> Self {
        Self {
            backend,
            sink,
            interval: interval.max(Duration::from_millis(1)),
            active: None,
        }
    }

    pub fn start_monitoring(&mut self, job_id: JobId) {
        self.stop_monitoring();
        if job_id.is_empty() {
            return;
        }

        let cancel = CancellationToken::new();
        tokio::spawn(run_interval(
            self.backend.clone(),
            self.sink.clone(),
            job_id.clone(),
            self.interval,
            cancel.clone(),
        ));
        outreach_info!(
            "Monitoring job {} every {} ms",
            job_id,
            self.interval.as_millis()
        );
        self.active = Some(ActiveInterval { job_id, cancel });
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            outreach_info!("Stopped monitoring job {}", active.job_id);
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.active.is_some()
    }

    pub fn monitored_job(&self) -> Option<&JobId> {
        self.active.as_ref().map(|active| &active.job_id)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

async fn run_interval(
    backend: Arc<dyn Backend>,
    sink: Arc<dyn ProgressSink>,
    job_id: JobId,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // Errors are reported and the tick skipped; the next tick is the retry.
        let result = backend.check_progress(&job_id).await;
        report_status(sink.as_ref(), &job_id, result);
    }
    outreach_debug!("Poll loop for job {} ended", job_id);
}
