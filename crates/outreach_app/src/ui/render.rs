use outreach_core::{format_count, AppViewModel, ExportView, JobStatus, ProgressView};

pub const BAR_WIDTH: usize = 30;

/// Text lines for the terminal; one call per state change.
pub fn render(view: &AppViewModel) -> Vec<String> {
    match &view.progress {
        Some(progress) => render_progress(progress),
        None => vec!["No active job".to_string()],
    }
}

fn render_progress(view: &ProgressView) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Job {} {} {:>3}% ({} / {})",
            view.job_id,
            render_bar(view.percent, BAR_WIDTH),
            view.percent,
            format_count(view.processed_count),
            format_count(view.total_count),
        ),
        format!("{} {}", status_marker(view.status), view.status_line),
    ];

    if let Some(notice) = &view.notice {
        lines.push(format!("  ! {notice}"));
    }
    match &view.export {
        Some(ExportView::InProgress) => lines.push("  Downloading results...".to_string()),
        Some(ExportView::Written { path, record_count }) => lines.push(format!(
            "  Saved {} records to {}",
            format_count(*record_count as u64),
            path
        )),
        Some(ExportView::Failed(message)) => lines.push(format!("  Export failed: {message}")),
        None if view.can_download => lines.push("  Results ready for download".to_string()),
        None => {}
    }
    lines
}

pub fn render_bar(percent: u8, width: usize) -> String {
    let filled = width * usize::from(percent.min(100)) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn status_marker(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "○",
        JobStatus::Processing => "…",
        JobStatus::Complete => "●",
        JobStatus::Error => "✗",
    }
}
