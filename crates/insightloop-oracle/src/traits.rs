use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::{DecisionRequest, ExtractionSource, OracleDecision, QuestionOutline};

/// Errors that can occur while consulting an oracle
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle response invalid: {0}")]
    ResponseInvalid(String),

    #[error("Guide extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Oracle configuration error: {0}")]
    Config(String),
}

/// Supported oracle backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleKind {
    Gemini,
    Command,
    Offline,
}

impl std::fmt::Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleKind::Gemini => write!(f, "gemini"),
            OracleKind::Command => write!(f, "command"),
            OracleKind::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for OracleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(OracleKind::Gemini),
            "command" | "cli" => Ok(OracleKind::Command),
            "offline" | "mock" | "outline" => Ok(OracleKind::Offline),
            _ => Err(format!("Unknown oracle backend: {}", s)),
        }
    }
}

/// Decides whether an interview should probe, advance or finish.
///
/// Implementations make exactly one attempt per call. Retry policy belongs
/// to the caller.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Ask for the next interview move given the goal, guide and transcript
    async fn decide(&self, request: &DecisionRequest) -> Result<OracleDecision, OracleError>;
}

/// Turns raw guide text or a document into ordered question outlines.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Extract core questions (with nested probes) in source order
    async fn extract(&self, source: &ExtractionSource)
        -> Result<Vec<QuestionOutline>, OracleError>;
}

/// A backend able to serve both oracle contracts
pub trait Oracle: DecisionOracle + ExtractionOracle {}

impl<T: DecisionOracle + ExtractionOracle> Oracle for T {}
