use std::collections::BTreeMap;
use std::fmt;

/// Columns every uploaded prospect must carry.
pub const DEFAULT_REQUIRED_FIELDS: &[&str] = &["email"];

/// One validated row of an uploaded prospect list, keyed by trimmed header name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProspectRow {
    fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// A required column is absent or blank.
    MissingField { field: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::MissingField { field } => write!(f, "missing required field '{field}'"),
        }
    }
}

impl std::error::Error for RowError {}

impl ProspectRow {
    /// Pairs `headers` with `values`. Missing trailing values become empty strings,
    /// surplus values and blank headers are dropped.
    pub fn from_record<H, V>(
        headers: &[H],
        values: &[V],
        required: &[&str],
    ) -> Result<Self, RowError>
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.as_ref().trim();
            if key.is_empty() {
                continue;
            }
            let value = values.get(idx).map(|v| v.as_ref().trim()).unwrap_or("");
            fields.entry(key.to_string()).or_insert_with(|| value.to_string());
        }

        let row = Self { fields };
        for field in required {
            if row.get(field).is_none_or(str::is_empty) {
                return Err(RowError::MissingField {
                    field: (*field).to_string(),
                });
            }
        }
        Ok(row)
    }

    /// Case-insensitive lookup by header name.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.fields
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.get("email").filter(|value| !value.is_empty())
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_headers_and_trims() {
        let row = ProspectRow::from_record(
            &[" Email ", "Company"],
            &[" ana@example.com ", "ACME"],
            DEFAULT_REQUIRED_FIELDS,
        )
        .unwrap();
        assert_eq!(row.get("email"), Some("ana@example.com"));
        assert_eq!(row.get("COMPANY"), Some("ACME"));
        assert_eq!(row.email(), Some("ana@example.com"));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let err =
            ProspectRow::from_record(&["email", "name"], &["  ", "Ana"], DEFAULT_REQUIRED_FIELDS)
                .unwrap_err();
        assert_eq!(
            err,
            RowError::MissingField {
                field: "email".to_string()
            }
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let row = ProspectRow::from_record(&["email", "name", "title"], &["a@b.c"], &[]).unwrap();
        assert_eq!(row.get("title"), Some(""));
        assert_eq!(row.fields().len(), 3);
    }
}
