use crate::{AppState, Effect, ExportState, JobStatus, LiveChannel, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::JobCreated {
            job_id,
            total_count,
        } => {
            if job_id.is_empty() {
                return (state, Vec::new());
            }
            let mut effects = state.close_live_channel();
            state.store_mut().initialize(job_id.clone(), total_count);
            state.set_notice(None);
            state.set_export(None);
            state.mark_dirty();
            if !state.store().is_complete() {
                effects.extend(state.open_live_channel(&job_id));
            }
            effects
        }
        Msg::ProgressReported {
            job_id,
            processed_count,
            is_complete,
        } => {
            if !state.store().is_active(&job_id) {
                return (state, Vec::new());
            }
            let was_complete = state.store().is_complete();
            let mut changed = state.store_mut().apply_update(processed_count);
            if is_complete {
                changed |= state.store_mut().mark_complete();
            }
            // A successful response supersedes an earlier transport hiccup.
            changed |= state.set_notice(None);
            if changed {
                state.mark_dirty();
            }
            if !was_complete && state.store().is_complete() {
                state.close_live_channel()
            } else {
                Vec::new()
            }
        }
        Msg::TransportFailed { job_id, message } => {
            let terminal = state.store().status().is_some_and(JobStatus::is_terminal);
            if state.store().is_active(&job_id) && !terminal && state.set_notice(Some(message)) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::JobRejected { job_id, message } => {
            if !state.store().is_active(&job_id) || !state.store_mut().fail(message) {
                return (state, Vec::new());
            }
            state.set_notice(None);
            state.mark_dirty();
            state.close_live_channel()
        }
        Msg::SubscriptionDropped { job_id } => {
            let terminal = state.store().status().is_some_and(JobStatus::is_terminal);
            if state.store().is_active(&job_id)
                && !terminal
                && state.live_channel() == LiveChannel::Subscribed
            {
                state.fall_back_to_polling(&job_id)
            } else {
                Vec::new()
            }
        }
        Msg::RefreshClicked => {
            let Some(job_id) = state.store().job_id().cloned() else {
                return (state, Vec::new());
            };
            if state.store().is_complete() {
                return (state, Vec::new());
            }
            if state.store_mut().clear_error() {
                state.mark_dirty();
            }
            // A freshly opened channel reads the count itself.
            if state.live_channel() == LiveChannel::Closed {
                state.open_live_channel(&job_id)
            } else {
                vec![Effect::RefreshProgress { job_id }]
            }
        }
        Msg::DownloadClicked => {
            let Some(job_id) = state.store().job_id().cloned() else {
                return (state, Vec::new());
            };
            if !state.store().is_complete()
                || matches!(state.export_state(), Some(ExportState::Exporting))
            {
                return (state, Vec::new());
            }
            state.set_export(Some(ExportState::Exporting));
            state.mark_dirty();
            vec![Effect::ExportResults { job_id }]
        }
        Msg::ExportFinished { job_id, result } => {
            if !state.store().is_active(&job_id) {
                return (state, Vec::new());
            }
            state.set_export(Some(match result {
                Ok(file) => ExportState::Exported(file),
                Err(message) => ExportState::Failed(message),
            }));
            state.mark_dirty();
            Vec::new()
        }
        Msg::ResetClicked => {
            if state.store().job().is_none() {
                return (state, Vec::new());
            }
            let effects = state.close_live_channel();
            state.store_mut().reset();
            state.set_notice(None);
            state.set_export(None);
            state.mark_dirty();
            effects
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
