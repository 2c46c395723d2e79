use std::path::PathBuf;
use std::sync::Once;

use outreach_core::{
    update, AppState, Effect, ExportView, ExportedFile, JobId, JobStatus, LiveChannel, Msg,
    Transport,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(outreach_logging::initialize_for_tests);
}

fn started(transport: Transport, total_count: u64) -> AppState {
    let (state, _) = update(
        AppState::with_transport(transport),
        Msg::JobCreated {
            job_id: JobId::from("a"),
            total_count,
        },
    );
    state
}

fn finished(total_count: u64) -> AppState {
    let (state, _) = update(
        started(Transport::Push, total_count),
        Msg::ProgressReported {
            job_id: JobId::from("a"),
            processed_count: total_count,
            is_complete: true,
        },
    );
    state
}

#[test]
fn switching_jobs_closes_the_previous_channel() {
    init_logging();
    let state = started(Transport::Poll, 10);
    let (state, effects) = update(
        state,
        Msg::JobCreated {
            job_id: JobId::from("b"),
            total_count: 3,
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::StopMonitoring,
            Effect::StartMonitoring {
                job_id: JobId::from("b")
            },
        ]
    );
    let view = state.view().progress.unwrap();
    assert_eq!(view.job_id, JobId::from("b"));
    assert_eq!(view.total_count, 3);
    assert_eq!(view.processed_count, 0);
}

#[test]
fn transport_failure_shows_notice_until_next_success() {
    init_logging();
    let state = started(Transport::Poll, 10);
    let (state, effects) = update(
        state,
        Msg::TransportFailed {
            job_id: JobId::from("a"),
            message: "connection refused".to_string(),
        },
    );
    assert!(effects.is_empty());
    let view = state.view().progress.unwrap();
    assert_eq!(view.notice.as_deref(), Some("connection refused"));
    assert_eq!(view.status, JobStatus::Pending);
    assert_eq!(state.live_channel(), LiveChannel::Polling);

    let (state, _) = update(
        state,
        Msg::ProgressReported {
            job_id: JobId::from("a"),
            processed_count: 1,
            is_complete: false,
        },
    );
    let view = state.view().progress.unwrap();
    assert_eq!(view.notice, None);
    assert_eq!(view.status_line, "Processing 1 of 10 prospects");
}

#[test]
fn rejection_marks_error_and_stops_the_channel() {
    init_logging();
    let state = started(Transport::Push, 10);
    let (state, effects) = update(
        state,
        Msg::JobRejected {
            job_id: JobId::from("a"),
            message: "survey not found".to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::Unsubscribe]);
    let view = state.view().progress.unwrap();
    assert_eq!(view.status, JobStatus::Error);
    assert_eq!(view.status_line, "Error: survey not found");

    let (state, effects) = update(state, Msg::RefreshClicked);
    assert_eq!(
        effects,
        vec![Effect::Subscribe {
            job_id: JobId::from("a")
        }]
    );
    assert_eq!(state.store().status(), Some(JobStatus::Pending));
}

#[test]
fn refresh_while_polling_issues_one_shot_query() {
    init_logging();
    let state = started(Transport::Poll, 10);
    let (_, effects) = update(state, Msg::RefreshClicked);
    assert_eq!(
        effects,
        vec![Effect::RefreshProgress {
            job_id: JobId::from("a")
        }]
    );
}

#[test]
fn dropped_subscription_falls_back_to_polling() {
    init_logging();
    let state = started(Transport::Push, 10);
    let (state, effects) = update(
        state,
        Msg::SubscriptionDropped {
            job_id: JobId::from("a"),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartMonitoring {
            job_id: JobId::from("a")
        }]
    );
    assert_eq!(state.live_channel(), LiveChannel::Polling);

    // A second drop notice is stale once polling took over.
    let (_, effects) = update(
        state,
        Msg::SubscriptionDropped {
            job_id: JobId::from("a"),
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn download_requires_completion() {
    init_logging();
    let state = started(Transport::Push, 10);
    let (state, effects) = update(state, Msg::DownloadClicked);
    assert!(effects.is_empty());
    assert!(state.export_state().is_none());
    assert!(!state.view().progress.unwrap().can_download);
}

#[test]
fn download_flow_records_written_file() {
    init_logging();
    let state = finished(2);
    let (state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(
        effects,
        vec![Effect::ExportResults {
            job_id: JobId::from("a")
        }]
    );
    assert_eq!(
        state.view().progress.unwrap().export,
        Some(ExportView::InProgress)
    );

    // A second click while the first export runs is ignored.
    let (state, effects) = update(state, Msg::DownloadClicked);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::ExportFinished {
            job_id: JobId::from("a"),
            result: Ok(ExportedFile {
                path: PathBuf::from("out/copies.csv"),
                record_count: 2,
            }),
        },
    );
    let view = state.view().progress.unwrap();
    assert_eq!(
        view.export,
        Some(ExportView::Written {
            path: PathBuf::from("out/copies.csv").display().to_string(),
            record_count: 2,
        })
    );
    assert!(view.can_download);
}

#[test]
fn failed_export_can_be_retried() {
    init_logging();
    let (state, _) = update(finished(1), Msg::DownloadClicked);
    let (state, _) = update(
        state,
        Msg::ExportFinished {
            job_id: JobId::from("a"),
            result: Err("http status 500".to_string()),
        },
    );
    assert_eq!(
        state.view().progress.unwrap().export,
        Some(ExportView::Failed("http status 500".to_string()))
    );

    let (_, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(effects.len(), 1);
}

#[test]
fn reset_clears_job_and_closes_channel() {
    init_logging();
    let state = started(Transport::Poll, 10);
    let (mut state, effects) = update(state, Msg::ResetClicked);

    assert_eq!(effects, vec![Effect::StopMonitoring]);
    assert!(state.view().progress.is_none());
    assert!(state.consume_dirty());

    let (_, effects) = update(state, Msg::ResetClicked);
    assert!(effects.is_empty());
}
