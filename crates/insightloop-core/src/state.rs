use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use insightloop_oracle::{HistoryEntry, StepKind};

/// One asked question and, once closed, the respondent's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub asked_at: DateTime<Utc>,
}

impl InterviewStep {
    pub fn open(kind: StepKind, question: impl Into<String>) -> Self {
        Self {
            kind,
            question: question.into(),
            response: None,
            asked_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.response.is_none()
    }

    pub fn is_probe(&self) -> bool {
        self.kind == StepKind::Probe
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            kind: self.kind,
            question: self.question.clone(),
            response: self.response.clone(),
        }
    }
}

/// Live state of one respondent's session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewState {
    pub core_question_index: usize,
    pub steps: Vec<InterviewStep>,
    pub is_complete: bool,
    pub is_processing: bool,
}

impl InterviewState {
    /// Seed a transcript with a single open step asking `first_question`
    pub fn seeded(first_question: &str) -> Self {
        Self {
            core_question_index: 0,
            steps: vec![InterviewStep::open(StepKind::Core, first_question)],
            is_complete: false,
            is_processing: false,
        }
    }

    /// The step awaiting an answer, if any
    pub fn open_step(&self) -> Option<&InterviewStep> {
        if self.is_complete || self.is_processing {
            return None;
        }
        self.steps.last().filter(|step| step.is_open())
    }

    pub fn answered_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_open()).count()
    }

    pub fn probe_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_probe()).count()
    }

    /// Completion percentage derived from the core question pointer
    pub fn progress(&self, total_core_questions: usize) -> u8 {
        if total_core_questions == 0 {
            return 100;
        }
        let ratio = ((self.core_question_index + 1) as f64 / total_core_questions as f64).min(1.0);
        (ratio * 100.0).round() as u8
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.steps.iter().map(InterviewStep::to_history).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_state_has_open_core_step() {
        let state = InterviewState::seeded("Q1");
        assert_eq!(state.steps.len(), 1);
        assert_eq!(state.open_step().map(|s| s.question.as_str()), Some("Q1"));
        assert_eq!(state.answered_steps(), 0);
    }

    #[test]
    fn test_progress_rounds_and_clamps() {
        let mut state = InterviewState::seeded("Q1");
        assert_eq!(state.progress(3), 33);
        state.core_question_index = 1;
        assert_eq!(state.progress(3), 67);
        state.core_question_index = 2;
        assert_eq!(state.progress(3), 100);
        state.core_question_index = 5;
        assert_eq!(state.progress(3), 100);
    }

    #[test]
    fn test_step_serializes_with_type_field() {
        let mut step = InterviewStep::open(StepKind::Probe, "Why?");
        step.response = Some("Because".into());
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "probe");
        assert_eq!(json["response"], "Because");
        assert!(json["askedAt"].is_string());
    }

    #[test]
    fn test_no_open_step_while_processing() {
        let mut state = InterviewState::seeded("Q1");
        state.is_processing = true;
        assert!(state.open_step().is_none());
    }
}
