//! Outreach engine: backend IO, progress channels and effect execution.
mod backend;
mod engine;
mod export;
mod notifier;
mod persist;
mod poller;
mod prospects;
mod survey;
mod types;

pub use backend::{Backend, BackendSettings, ChannelProgressSink, ProgressSink, ReqwestBackend};
pub use engine::{EngineConfig, EngineHandle, EngineStopped};
pub use export::{
    export_results, render_results_csv, ExportError, ExportOptions, ExportSummary, EXPORT_HEADER,
};
pub use notifier::{
    ChangeFeed, ChangeNotifier, FeedError, HttpChangeFeed, InsertNotice, NoticeStream,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{Poller, DEFAULT_POLL_INTERVAL};
pub use prospects::{load_prospects, parse_prospects, IngestError, ProspectSheet};
pub use survey::{Survey, SurveyError};
pub use types::{BackendError, EngineEvent, FailureKind, OutreachRecord, ProgressSnapshot};
