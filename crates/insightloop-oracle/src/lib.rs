//! # insightloop-oracle
//!
//! Adapters for the external reasoning services the interview engine consults.
//!
//! - [`DecisionOracle`] - given the goal, guide and transcript, decide whether
//!   to probe, advance or finish
//! - [`ExtractionOracle`] - turn guide text or a document into question outlines
//!
//! ## Backends
//!
//! - [`GeminiOracle`] - HTTP `generateContent` with JSON response schemas
//! - [`CommandOracle`] - an external CLI printing JSON to stdout
//! - [`OutlineOracle`] - offline outline reader; never decides

mod command;
mod decision;
mod gemini;
mod outline;
mod prompts;
mod spawner;
mod traits;
mod types;

pub use command::CommandOracle;
pub use decision::{parse_outlines, DecisionParseError, OracleDecision};
pub use gemini::{GeminiConfig, GeminiOracle};
pub use outline::OutlineOracle;
pub use prompts::{OraclePrompts, INTERVIEWER_INSTRUCTION};
pub use spawner::{ProcessOutput, ProcessSpawner};
pub use traits::{DecisionOracle, ExtractionOracle, Oracle, OracleError, OracleKind};
pub use types::{
    DecisionRequest, ExtractionSource, HistoryEntry, InlineDocument, QuestionOutline, StepKind,
};
