use crate::{JobId, JobProgress, JobStatus, Transport};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub progress: Option<ProgressView>,
    pub transport: Transport,
    pub dirty: bool,
}

/// Render-ready snapshot of one job. Carries no behaviour of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub job_id: JobId,
    /// Clamped to `total_count`.
    pub processed_count: u64,
    pub total_count: u64,
    pub percent: u8,
    pub status: JobStatus,
    pub status_line: String,
    pub notice: Option<String>,
    pub can_download: bool,
    pub export: Option<ExportView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportView {
    InProgress,
    Written { path: String, record_count: usize },
    Failed(String),
}

impl ProgressView {
    pub(crate) fn from_job(job: &JobProgress) -> Self {
        let processed = job.processed_count.min(job.total_count);
        Self {
            job_id: job.job_id.clone(),
            processed_count: processed,
            total_count: job.total_count,
            percent: progress_percent(job.processed_count, job.total_count),
            status: job.status,
            status_line: status_line(
                job.status,
                processed,
                job.total_count,
                job.last_error.as_deref(),
            ),
            notice: None,
            can_download: job.status == JobStatus::Complete,
            export: None,
        }
    }
}

/// `min(processed / total * 100, 100)`, rounded down. An empty job counts as done.
pub fn progress_percent(processed_count: u64, total_count: u64) -> u8 {
    if total_count == 0 {
        return 100;
    }
    let clamped = processed_count.min(total_count) as u128;
    (clamped * 100 / total_count as u128) as u8
}

/// Groups thousands with commas: `1234567` becomes `1,234,567`.
pub fn format_count(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

fn status_line(status: JobStatus, processed: u64, total: u64, error: Option<&str>) -> String {
    let (processed, total) = (format_count(processed), format_count(total));
    match status {
        JobStatus::Pending => format!("Waiting for processing of {total} prospects"),
        JobStatus::Processing => format!("Processing {processed} of {total} prospects"),
        JobStatus::Complete => format!("Complete: {processed} of {total} prospects processed"),
        JobStatus::Error => format!("Error: {}", error.unwrap_or("unknown failure")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down_and_clamps() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(9, 3), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn counts_group_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn status_line_groups_thousands() {
        assert_eq!(
            status_line(JobStatus::Processing, 500, 2_000, None),
            "Processing 500 of 2,000 prospects"
        );
        assert_eq!(
            status_line(JobStatus::Pending, 0, 12_500, None),
            "Waiting for processing of 12,500 prospects"
        );
    }

    #[test]
    fn percent_handles_huge_counts() {
        assert_eq!(progress_percent(u64::MAX / 2, u64::MAX), 49);
    }
}
