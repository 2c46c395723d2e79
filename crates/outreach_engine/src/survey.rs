use serde::{Deserialize, Serialize};

/// Answers from the survey describing the target audience and outreach tone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Survey {
    pub audience: String,
    #[serde(default)]
    pub industry: String,
    pub tone: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub extra_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("survey answer '{0}' is required")]
    MissingAnswer(&'static str),
}

impl Survey {
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.audience.trim().is_empty() {
            return Err(SurveyError::MissingAnswer("audience"));
        }
        if self.tone.trim().is_empty() {
            return Err(SurveyError::MissingAnswer("tone"));
        }
        Ok(())
    }
}
