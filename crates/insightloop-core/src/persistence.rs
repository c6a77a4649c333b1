use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InterviewStep;

/// Short per-session token; collision-avoiding, not globally verifiable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RespondentId(String);

impl RespondentId {
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..9].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RespondentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for RespondentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A finished interview ready to hand to a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub study_name: String,
    pub respondent_id: RespondentId,
    pub steps: Vec<InterviewStep>,
    pub completed_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn new(study_name: String, respondent_id: RespondentId, steps: Vec<InterviewStep>) -> Self {
        Self {
            study_name,
            respondent_id,
            steps,
            completed_at: Utc::now(),
        }
    }

    /// The step array as JSON
    pub fn interview_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.steps)
    }

    /// Readable `Q:`/`A:` rendering, one block per step
    pub fn summary_text(&self) -> String {
        self.steps
            .iter()
            .map(|step| {
                format!(
                    "Q: {}\nA: {}",
                    step.question,
                    step.response.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Result of a save attempt. Failures carry a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { message: String },
    Failed { message: String },
}

impl SaveOutcome {
    pub fn saved(message: impl Into<String>) -> Self {
        Self::Saved {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Saved { message } | Self::Failed { message } => message,
        }
    }
}

/// Destination for finished transcripts.
///
/// Implementations report failure through [`SaveOutcome::Failed`]; a save
/// never raises into the interview flow.
#[async_trait]
pub trait TranscriptGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, record: &TranscriptRecord) -> SaveOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use insightloop_oracle::StepKind;

    fn answered(kind: StepKind, question: &str, answer: &str) -> InterviewStep {
        let mut step = InterviewStep::open(kind, question);
        step.response = Some(answer.to_string());
        step
    }

    #[test]
    fn test_summary_text() {
        let record = TranscriptRecord::new(
            "Study".into(),
            RespondentId::from("r1"),
            vec![
                answered(StepKind::Core, "How are you?", "Fine"),
                answered(StepKind::Probe, "Why?", "Slept well"),
            ],
        );
        assert_eq!(
            record.summary_text(),
            "Q: How are you?\nA: Fine\n\nQ: Why?\nA: Slept well"
        );
    }

    #[test]
    fn test_interview_json_is_step_array() {
        let record = TranscriptRecord::new(
            "Study".into(),
            RespondentId::generate(),
            vec![answered(StepKind::Core, "Q1", "A1")],
        );
        let json: serde_json::Value = serde_json::from_str(&record.interview_json().unwrap()).unwrap();
        assert_eq!(json[0]["type"], "core");
        assert_eq!(json[0]["question"], "Q1");
    }

    #[test]
    fn test_respondent_ids_are_short_tokens() {
        let id = RespondentId::generate();
        assert_eq!(id.as_str().len(), 9);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_save_outcome_message() {
        assert!(SaveOutcome::saved("ok").is_saved());
        assert_eq!(SaveOutcome::failed("disk full").message(), "disk full");
    }
}
