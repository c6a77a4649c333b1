//! # insightloop-core
//!
//! The adaptive interview engine.
//!
//! [`InterviewSession`] is the synchronous state machine: it tracks the core
//! question pointer and the append-only transcript, and resolves each oracle
//! decision (or failure) into the next step. [`InterviewRunner`] drives a
//! session asynchronously: one decision in flight at a time, a bounded oracle
//! timeout, and a fire-and-forget hand-off to a [`TranscriptGateway`].

mod error;
mod outcome;
mod persistence;
mod runner;
mod session;
mod state;

pub use error::InterviewError;
pub use outcome::InterviewOutcome;
pub use persistence::{RespondentId, SaveOutcome, TranscriptGateway, TranscriptRecord};
pub use runner::{InterviewRunner, Submission, DEFAULT_DECISION_TIMEOUT};
pub use session::{InterviewSession, Transition};
pub use state::{InterviewState, InterviewStep};

pub use insightloop_oracle::StepKind;
