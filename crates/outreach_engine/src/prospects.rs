use std::fs;
use std::io::{self, Read};
use std::path::Path;

use outreach_core::{ProspectRow, RowError};
use outreach_logging::outreach_info;

/// The validated contents of an uploaded prospect list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProspectSheet {
    headers: Vec<String>,
    rows: Vec<ProspectRow>,
}

impl ProspectSheet {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[ProspectRow] {
        &self.rows
    }

    /// Seeds the job's total count.
    pub fn total_count(&self) -> u64 {
        self.rows.len() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("expected a .csv file, got {0:?}")]
    WrongFileType(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("the file has no header row")]
    NoHeaders,
    #[error("the file contains no prospects")]
    Empty,
    #[error("line {line}: {source}")]
    InvalidRow { line: u64, source: RowError },
}

/// Reads and validates a prospect CSV. Nothing is returned unless every row passes.
pub fn load_prospects(path: &Path, required: &[&str]) -> Result<ProspectSheet, IngestError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(IngestError::WrongFileType(path.display().to_string()));
    }

    let sheet = parse_prospects(fs::File::open(path)?, required)?;
    outreach_info!(
        "Loaded {} prospects from {:?} (columns: {})",
        sheet.total_count(),
        path,
        sheet.headers.join(", ")
    );
    Ok(sheet)
}

/// Parses prospect CSV text. Comma and semicolon separated files are both accepted.
pub fn parse_prospects<R: Read>(
    mut input: R,
    required: &[&str],
) -> Result<ProspectSheet, IngestError> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let values: Vec<&str> = record.iter().collect();
        let row = ProspectRow::from_record(&headers, &values, required)
            .map_err(|source| IngestError::InvalidRow { line, source })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(ProspectSheet { headers, rows })
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}
