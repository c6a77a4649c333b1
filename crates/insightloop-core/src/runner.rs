use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use insightloop_guide::StudyConfig;
use insightloop_logging::{LogEvent, Logger};
use insightloop_oracle::{DecisionOracle, DecisionRequest, OracleDecision, OracleError, StepKind};

use crate::persistence::{SaveOutcome, TranscriptGateway, TranscriptRecord};
use crate::session::{InterviewSession, Transition};
use crate::{InterviewError, InterviewOutcome, InterviewState, RespondentId};

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(20);

/// What happened to a submitted answer
#[derive(Debug)]
pub enum Submission {
    /// Blank answer, a decision already in flight, or a finished session
    Ignored,
    /// The next question to put to the respondent
    Asked {
        kind: StepKind,
        question: String,
        progress: u8,
    },
    Completed(InterviewOutcome),
}

/// Drives one interview session against an oracle and a transcript gateway.
///
/// The session lock is held only while applying transitions, never across the
/// oracle call. Persistence runs on a spawned task once the session completes.
pub struct InterviewRunner {
    session: Mutex<InterviewSession>,
    oracle: Arc<dyn DecisionOracle>,
    gateway: Arc<dyn TranscriptGateway>,
    logger: Arc<Logger>,
    decision_timeout: Duration,
    started_at: Instant,
    persistence: Mutex<Option<JoinHandle<SaveOutcome>>>,
}

impl InterviewRunner {
    pub fn start(
        config: StudyConfig,
        oracle: Arc<dyn DecisionOracle>,
        gateway: Arc<dyn TranscriptGateway>,
        logger: Arc<Logger>,
    ) -> Result<Self, InterviewError> {
        let session = InterviewSession::start(config)?;

        logger.log(&LogEvent::InterviewStarted {
            study_name: session.config().study_name.clone(),
            respondent_id: session.respondent_id().to_string(),
            core_questions: session.config().question_count(),
            oracle: oracle.name().to_string(),
        });

        Ok(Self {
            session: Mutex::new(session),
            oracle,
            gateway,
            logger,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
            started_at: Instant::now(),
            persistence: Mutex::new(None),
        })
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn respondent_id(&self) -> RespondentId {
        self.lock().respondent_id().clone()
    }

    /// The open question, if the session is accepting input
    pub fn current_question(&self) -> Option<(StepKind, String)> {
        self.lock()
            .current_step()
            .map(|step| (step.kind, step.question.clone()))
    }

    pub fn progress(&self) -> u8 {
        self.lock().progress()
    }

    pub fn is_processing(&self) -> bool {
        self.lock().is_processing()
    }

    pub fn is_complete(&self) -> bool {
        self.lock().is_complete()
    }

    pub fn snapshot(&self) -> InterviewState {
        self.lock().state().clone()
    }

    /// Submit the respondent's answer to the open question
    pub async fn submit(&self, answer: &str) -> Submission {
        let (request, step) = {
            let mut session = self.lock();
            match session.begin_answer(answer) {
                Some(request) => (request, session.steps().len() - 1),
                None => {
                    debug!("Submission ignored");
                    return Submission::Ignored;
                }
            }
        };

        self.logger.log(&LogEvent::AnswerRecorded {
            step,
            probe: request
                .history
                .last()
                .is_some_and(|entry| entry.kind == StepKind::Probe),
            answer_chars: answer.trim().chars().count(),
        });

        let result = self.decide(&request).await;
        let reason = match &result {
            Ok(decision) => {
                self.logger.log(&LogEvent::DecisionReceived {
                    step,
                    decision: decision.short_description(),
                    reasoning: decision.reasoning.clone(),
                });
                "decision has no next question".to_string()
            }
            Err(e) => e.to_string(),
        };

        let mut session = self.lock();
        match session.apply_decision(result) {
            Transition::Asked {
                kind,
                question,
                fallback,
            } => {
                if fallback {
                    self.logger.log(&LogEvent::OracleFallback {
                        step,
                        reason,
                        advanced_to: Some(session.state().core_question_index),
                    });
                }
                Submission::Asked {
                    kind,
                    question,
                    progress: session.progress(),
                }
            }
            Transition::Completed { fallback } => {
                if fallback {
                    self.logger.log(&LogEvent::OracleFallback {
                        step,
                        reason,
                        advanced_to: None,
                    });
                }
                let outcome = self.finish(&session);
                drop(session);
                Submission::Completed(outcome)
            }
            Transition::Ignored => Submission::Ignored,
        }
    }

    /// End the session early without persisting anything
    pub fn exit(&self) -> Result<InterviewOutcome, InterviewError> {
        let outcome = self.lock().exit()?;
        self.logger.log(&LogEvent::InterviewExited {
            respondent_id: outcome.respondent_id().to_string(),
            steps: outcome.steps(),
        });
        Ok(outcome)
    }

    /// Handle of the background save, once the session has completed
    pub fn take_persistence(&self) -> Option<JoinHandle<SaveOutcome>> {
        self.persistence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<OracleDecision, OracleError> {
        debug!(
            oracle = self.oracle.name(),
            history = request.history.len(),
            "Requesting decision"
        );

        match tokio::time::timeout(self.decision_timeout, self.oracle.decide(request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.decision_timeout)),
        }
    }

    fn finish(&self, session: &InterviewSession) -> InterviewOutcome {
        let outcome = InterviewOutcome::completed(
            session.respondent_id().clone(),
            session.steps().to_vec(),
            session.fallbacks(),
            self.started_at.elapsed(),
        );

        self.logger.log(&LogEvent::InterviewCompleted {
            respondent_id: session.respondent_id().to_string(),
            steps: outcome.steps(),
            fallbacks: session.fallbacks(),
            duration_secs: self.started_at.elapsed().as_secs_f64(),
        });

        let record = TranscriptRecord::new(
            session.config().study_name.clone(),
            session.respondent_id().clone(),
            session.steps().to_vec(),
        );
        self.persist(record);

        outcome
    }

    fn persist(&self, record: TranscriptRecord) {
        let gateway = Arc::clone(&self.gateway);
        let logger = Arc::clone(&self.logger);

        let handle = tokio::spawn(async move {
            let respondent_id = record.respondent_id.to_string();
            let outcome = gateway.save(&record).await;

            match &outcome {
                SaveOutcome::Saved { message } => {
                    info!(gateway = gateway.name(), respondent = %respondent_id, "Transcript saved");
                    logger.log(&LogEvent::TranscriptSaved {
                        respondent_id,
                        message: message.clone(),
                    });
                }
                SaveOutcome::Failed { message } => {
                    warn!(gateway = gateway.name(), error = %message, "Transcript save failed");
                    logger.log(&LogEvent::TranscriptSaveFailed {
                        respondent_id,
                        error: message.clone(),
                    });
                }
            }

            outcome
        });

        *self
            .persistence
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn lock(&self) -> MutexGuard<'_, InterviewSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
