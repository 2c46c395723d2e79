use std::io;
use std::path::{Path, PathBuf};

use outreach_core::JobId;
use outreach_logging::outreach_info;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::{Backend, BackendError, OutreachRecord};

/// Column titles of the downloaded file, in output order.
pub const EXPORT_HEADER: [&str; 5] = [
    "Primeiro Nome",
    "Cargo",
    "Empresa",
    "Email",
    "Copy Personalizada",
];

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Overrides the `outreach-copies-<job>.csv` default.
    pub output_filename: Option<String>,
}

impl ExportOptions {
    pub fn filename_for(&self, job_id: &JobId) -> String {
        match &self.output_filename {
            Some(name) => name.clone(),
            None => {
                let safe: String = job_id
                    .as_str()
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect();
                format!("outreach-copies-{safe}.csv")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub record_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Serializes records with a header row. Fields are quoted only when needed,
/// embedded quotes are doubled.
pub fn render_results_csv(records: &[OutreachRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for record in records {
        writer.write_record([
            record.first_name.as_str(),
            record.job_title.as_str(),
            record.company.as_str(),
            record.email.as_str(),
            record.copy.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

/// Downloads every processed record of `job_id` and writes them to `output_dir`.
pub async fn export_results(
    backend: &dyn Backend,
    job_id: &JobId,
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let records = backend.fetch_results(job_id).await?;
    let content = render_results_csv(&records)?;

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let output_path = writer.write(&options.filename_for(job_id), content.as_bytes())?;
    outreach_info!(
        "Exported {} records for job {} to {:?}",
        records.len(),
        job_id,
        output_path
    );

    Ok(ExportSummary {
        record_count: records.len(),
        output_path,
    })
}
