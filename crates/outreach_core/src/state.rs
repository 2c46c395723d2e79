use crate::view_model::{AppViewModel, ExportView, ProgressView};
use crate::{Effect, ExportedFile, JobId, ProgressStore};

/// How progress reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Change subscription, re-querying the count on each notice.
    #[default]
    Push,
    /// Periodic status requests.
    Poll,
}

/// The update channel currently open for the active job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveChannel {
    #[default]
    Closed,
    Subscribed,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Exporting,
    Exported(ExportedFile),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    store: ProgressStore,
    transport: Transport,
    live: LiveChannel,
    notice: Option<String>,
    export: Option<ExportState>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self {
            transport,
            ..Self::default()
        }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn live_channel(&self) -> LiveChannel {
        self.live
    }

    pub fn export_state(&self) -> Option<&ExportState> {
        self.export.as_ref()
    }

    pub fn view(&self) -> AppViewModel {
        let progress = self.store.job().map(|job| {
            let mut view = ProgressView::from_job(job);
            view.notice = self.notice.clone();
            view.export = self.export.as_ref().map(|export| match export {
                ExportState::Exporting => ExportView::InProgress,
                ExportState::Exported(file) => ExportView::Written {
                    path: file.path.display().to_string(),
                    record_count: file.record_count,
                },
                ExportState::Failed(message) => ExportView::Failed(message.clone()),
            });
            view.can_download &= !matches!(self.export, Some(ExportState::Exporting));
            view
        });
        AppViewModel {
            progress,
            transport: self.transport,
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    pub(crate) fn set_notice(&mut self, notice: Option<String>) -> bool {
        if self.notice == notice {
            return false;
        }
        self.notice = notice;
        true
    }

    pub(crate) fn set_export(&mut self, export: Option<ExportState>) {
        self.export = export;
    }

    /// Opens the configured channel for `job_id` and returns the effects to run.
    pub(crate) fn open_live_channel(&mut self, job_id: &JobId) -> Vec<Effect> {
        match self.transport {
            Transport::Push => {
                self.live = LiveChannel::Subscribed;
                // The subscription reads the current count once it is live.
                vec![Effect::Subscribe {
                    job_id: job_id.clone(),
                }]
            }
            Transport::Poll => self.fall_back_to_polling(job_id),
        }
    }

    pub(crate) fn fall_back_to_polling(&mut self, job_id: &JobId) -> Vec<Effect> {
        self.live = LiveChannel::Polling;
        vec![Effect::StartMonitoring {
            job_id: job_id.clone(),
        }]
    }

    /// Closes whatever channel is open and returns the effect needed to do so.
    pub(crate) fn close_live_channel(&mut self) -> Vec<Effect> {
        match std::mem::take(&mut self.live) {
            LiveChannel::Closed => Vec::new(),
            LiveChannel::Subscribed => vec![Effect::Unsubscribe],
            LiveChannel::Polling => vec![Effect::StopMonitoring],
        }
    }
}
