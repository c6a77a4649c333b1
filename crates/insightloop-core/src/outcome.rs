use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{InterviewStep, RespondentId};

/// The final outcome of one respondent's interview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InterviewOutcome {
    /// The session reached its terminal state and was handed to persistence
    Completed {
        respondent_id: RespondentId,
        steps: usize,
        /// Decisions resolved by the fallback policy instead of the oracle
        fallbacks: usize,
        #[serde(skip)]
        transcript: Vec<InterviewStep>,
        total_duration_secs: f64,
    },
    /// The operator ended the session early; nothing was persisted
    Exited {
        respondent_id: RespondentId,
        steps: usize,
    },
}

impl InterviewOutcome {
    pub fn completed(
        respondent_id: RespondentId,
        transcript: Vec<InterviewStep>,
        fallbacks: usize,
        duration: Duration,
    ) -> Self {
        Self::Completed {
            respondent_id,
            steps: transcript.len(),
            fallbacks,
            transcript,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn exited(respondent_id: RespondentId, steps: usize) -> Self {
        Self::Exited {
            respondent_id,
            steps,
        }
    }

    pub fn respondent_id(&self) -> &RespondentId {
        match self {
            Self::Completed { respondent_id, .. } | Self::Exited { respondent_id, .. } => {
                respondent_id
            }
        }
    }

    pub fn steps(&self) -> usize {
        match self {
            Self::Completed { steps, .. } | Self::Exited { steps, .. } => *steps,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Exited { .. } => 130,
        }
    }
}
