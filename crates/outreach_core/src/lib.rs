//! Outreach core: pure progress state machine and view-model helpers.
mod effect;
mod job;
mod msg;
mod prospect;
mod state;
mod store;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{JobId, JobProgress, JobStatus};
pub use msg::{ExportOutcome, ExportedFile, Msg};
pub use prospect::{ProspectRow, RowError, DEFAULT_REQUIRED_FIELDS};
pub use state::{AppState, ExportState, LiveChannel, Transport};
pub use store::ProgressStore;
pub use update::update;
pub use view_model::{format_count, progress_percent, AppViewModel, ExportView, ProgressView};
