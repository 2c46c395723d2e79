//! Drives one job: engine events in, reducer, effects out, render on change.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use outreach_core::{update, AppState, AppViewModel, ExportState, JobStatus, Msg, Transport};
use outreach_engine::{EngineEvent, EngineHandle};
use outreach_logging::{outreach_debug, outreach_info, outreach_warn};

use crate::ui;

/// How long to wait for an engine event before emitting a render tick.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every row processed and the results written to disk.
    Exported { path: PathBuf, record_count: usize },
    /// Every row processed; export was not requested.
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub transport: Transport,
    /// Download the results once every row is processed.
    pub auto_export: bool,
    /// Issue a refresh when no progress arrived for this long.
    pub refresh_after: Option<Duration>,
}

pub struct Session<'a> {
    engine: &'a EngineHandle,
    state: AppState,
    auto_export: bool,
    refresh_after: Option<Duration>,
}

impl<'a> Session<'a> {
    pub fn new(engine: &'a EngineHandle, settings: SessionSettings) -> Self {
        Self {
            engine,
            state: AppState::with_transport(settings.transport),
            auto_export: settings.auto_export,
            refresh_after: settings.refresh_after,
        }
    }

    /// Processes engine events until the job completes (and is exported) or fails.
    pub fn run(&mut self, initial: Option<Msg>) -> SessionEnd {
        if let Some(msg) = initial {
            self.dispatch(msg);
        }
        let mut last_progress = Instant::now();
        loop {
            if let Some(end) = self.check_finished() {
                return end;
            }
            match self.engine.recv_timeout(TICK_INTERVAL) {
                Err(stopped) => {
                    return SessionEnd::Failed(format!("lost the backend connection: {stopped}"));
                }
                Ok(Some(EngineEvent::JobStartFailed { error })) => {
                    return SessionEnd::Failed(format!("could not start the job: {error}"));
                }
                Ok(Some(event)) => {
                    if matches!(event, EngineEvent::Progress { .. }) {
                        last_progress = Instant::now();
                    }
                    if let Some(msg) = to_msg(event) {
                        self.dispatch(msg);
                    }
                }
                Ok(None) => self.dispatch(Msg::Tick),
            }
            if self.refresh_due(last_progress.elapsed()) {
                outreach_info!("No progress for {:?}; refreshing", last_progress.elapsed());
                self.dispatch(Msg::RefreshClicked);
                last_progress = Instant::now();
            }
        }
    }

    fn refresh_due(&self, idle: Duration) -> bool {
        let in_flight = matches!(
            self.state.store().status(),
            Some(JobStatus::Pending | JobStatus::Processing)
        );
        in_flight && self.refresh_after.is_some_and(|after| idle >= after)
    }

    fn check_finished(&mut self) -> Option<SessionEnd> {
        let job = self.state.store().job()?;
        match job.status {
            JobStatus::Error => Some(SessionEnd::Failed(
                job.last_error
                    .clone()
                    .unwrap_or_else(|| "job failed".to_string()),
            )),
            JobStatus::Complete if !self.auto_export => Some(SessionEnd::Completed),
            JobStatus::Complete => match self.state.export_state() {
                None => {
                    self.dispatch(Msg::DownloadClicked);
                    None
                }
                Some(ExportState::Exporting) => None,
                Some(ExportState::Exported(file)) => Some(SessionEnd::Exported {
                    path: file.path.clone(),
                    record_count: file.record_count,
                }),
                Some(ExportState::Failed(message)) => {
                    Some(SessionEnd::Failed(format!("export failed: {message}")))
                }
            },
            JobStatus::Pending | JobStatus::Processing => None,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        outreach_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        for effect in effects {
            outreach_info!("Effect {:?}", effect);
            self.engine.execute(effect);
        }
        if was_dirty {
            render(&view);
        }
    }
}

fn to_msg(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::JobStarted {
            job_id,
            total_count,
        } => Msg::JobCreated {
            job_id,
            total_count,
        },
        EngineEvent::Progress { job_id, snapshot } => Msg::ProgressReported {
            job_id,
            processed_count: snapshot.processed_count,
            is_complete: snapshot.is_complete,
        },
        EngineEvent::TransportError { job_id, error } => Msg::TransportFailed {
            job_id,
            message: error.to_string(),
        },
        EngineEvent::JobRejected { job_id, error } => Msg::JobRejected {
            job_id,
            message: error.message,
        },
        EngineEvent::SubscriptionDropped { job_id, reason } => {
            outreach_warn!("Live updates for job {} stopped: {}", job_id, reason);
            Msg::SubscriptionDropped { job_id }
        }
        EngineEvent::ExportCompleted { job_id, result } => Msg::ExportFinished {
            job_id,
            result: result.map(|summary| outreach_core::ExportedFile {
                path: summary.output_path,
                record_count: summary.record_count,
            }),
        },
        EngineEvent::JobStartFailed { .. } => return None,
    };
    Some(msg)
}

fn render(view: &AppViewModel) {
    let stamp = Local::now().format("%H:%M:%S");
    for line in ui::render::render(view) {
        println!("[{stamp}] {line}");
    }
}
