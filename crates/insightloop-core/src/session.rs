//! The interview state machine.
//!
//! ```text
//! AwaitingAnswer(n) --begin_answer--> Deciding --apply_decision--> AwaitingAnswer(n+1)
//!                                                              \-> Complete
//! ```
//!
//! The machine is synchronous. Whoever drives it calls the decision oracle
//! between [`InterviewSession::begin_answer`] and
//! [`InterviewSession::apply_decision`]; `is_processing` is held for exactly
//! that window and is the session's single-flight guard.

use tracing::{debug, info, warn};

use insightloop_guide::StudyConfig;
use insightloop_oracle::{DecisionRequest, OracleDecision, OracleError, StepKind};

use crate::{InterviewError, InterviewOutcome, InterviewState, InterviewStep, RespondentId};

/// How a decision was applied to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new open step was appended
    Asked {
        kind: StepKind,
        question: String,
        /// The step came from the fallback policy rather than the oracle
        fallback: bool,
    },
    /// The session reached its terminal state
    Completed { fallback: bool },
    /// Nothing was outstanding, or the session was exited mid-decision
    Ignored,
}

/// One respondent's interview over a validated guide
#[derive(Debug, Clone)]
pub struct InterviewSession {
    config: StudyConfig,
    respondent_id: RespondentId,
    state: InterviewState,
    fallbacks: usize,
    exited: bool,
}

impl InterviewSession {
    /// Start a session at the first core question
    pub fn start(config: StudyConfig) -> Result<Self, InterviewError> {
        config.validate()?;

        let first = config
            .core_questions
            .first()
            .map(|q| q.text.clone())
            .unwrap_or_default();

        let respondent_id = RespondentId::generate();
        info!(
            study = %config.study_name,
            respondent = %respondent_id,
            questions = config.question_count(),
            "Interview session started"
        );

        Ok(Self {
            state: InterviewState::seeded(&first),
            config,
            respondent_id,
            fallbacks: 0,
            exited: false,
        })
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn respondent_id(&self) -> &RespondentId {
        &self.respondent_id
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn steps(&self) -> &[InterviewStep] {
        &self.state.steps
    }

    /// The step waiting for the respondent, if input is currently accepted
    pub fn current_step(&self) -> Option<&InterviewStep> {
        if self.exited {
            return None;
        }
        self.state.open_step()
    }

    pub fn progress(&self) -> u8 {
        self.state.progress(self.config.question_count())
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Number of oracle failures absorbed by the fallback policy
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Close the open step with `answer` and enter the deciding state.
    ///
    /// Returns the oracle request to issue, or `None` when the submission is
    /// a no-op: blank answer, a decision already outstanding, or a session
    /// that is complete or exited.
    pub fn begin_answer(&mut self, answer: &str) -> Option<DecisionRequest> {
        let answer = answer.trim();
        if answer.is_empty() || self.current_step().is_none() {
            return None;
        }

        let step = self.state.steps.last_mut()?;
        step.response = Some(answer.to_string());
        self.state.is_processing = true;

        debug!(
            step = self.state.steps.len(),
            core_index = self.state.core_question_index,
            "Answer recorded, awaiting decision"
        );

        Some(DecisionRequest {
            goal: self.config.research_goal.clone(),
            core_questions: self.config.outlines(),
            history: self.state.history(),
        })
    }

    /// Resolve the outstanding decision.
    ///
    /// Oracle failures never surface here: they advance to the next core
    /// question verbatim, or complete the session when none remain.
    pub fn apply_decision(
        &mut self,
        result: Result<OracleDecision, OracleError>,
    ) -> Transition {
        if !self.state.is_processing {
            return Transition::Ignored;
        }
        self.state.is_processing = false;

        if self.exited {
            debug!("Discarding decision for exited session");
            return Transition::Ignored;
        }

        match result {
            Ok(decision) if decision.topic_exhausted => {
                info!(reasoning = %decision.reasoning, "Oracle finished the interview");
                self.complete(false)
            }
            Ok(decision) if !decision.next_question.trim().is_empty() => {
                let kind = if decision.is_probe {
                    StepKind::Probe
                } else {
                    self.state.core_question_index += 1;
                    StepKind::Core
                };
                self.ask(kind, decision.next_question.trim().to_string(), false)
            }
            Ok(_) => self.fall_back(&OracleError::ResponseInvalid(
                "decision has no next question".to_string(),
            )),
            Err(e) => self.fall_back(&e),
        }
    }

    /// Abandon a session that has not completed. Nothing is persisted.
    pub fn exit(&mut self) -> Result<InterviewOutcome, InterviewError> {
        if self.state.is_complete {
            return Err(InterviewError::SessionComplete);
        }
        self.exited = true;
        info!(respondent = %self.respondent_id, "Interview exited");
        Ok(InterviewOutcome::exited(
            self.respondent_id.clone(),
            self.state.answered_steps(),
        ))
    }

    fn fall_back(&mut self, error: &OracleError) -> Transition {
        self.fallbacks += 1;
        let next_index = self.state.core_question_index + 1;

        match self.config.core_questions.get(next_index) {
            Some(question) => {
                warn!(error = %error, next_index, "Oracle failed, advancing to next core question");
                let text = question.text.clone();
                self.state.core_question_index = next_index;
                self.ask(StepKind::Core, text, true)
            }
            None => {
                warn!(error = %error, "Oracle failed with no core questions left, completing");
                self.complete(true)
            }
        }
    }

    fn ask(&mut self, kind: StepKind, question: String, fallback: bool) -> Transition {
        self.state
            .steps
            .push(InterviewStep::open(kind, question.clone()));
        Transition::Asked {
            kind,
            question,
            fallback,
        }
    }

    fn complete(&mut self, fallback: bool) -> Transition {
        self.state.is_complete = true;
        Transition::Completed { fallback }
    }
}
