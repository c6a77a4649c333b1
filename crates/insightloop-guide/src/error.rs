use thiserror::Error;

use crate::QuestionId;

#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Guide extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Study name is empty")]
    EmptyStudyName,

    #[error("Research goal is empty")]
    EmptyResearchGoal,

    #[error("Guide has no core questions")]
    EmptyGuide,

    #[error("Core question {position} has no text")]
    EmptyQuestion { position: usize },

    #[error("Duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error("Unknown question id: {0}")]
    UnknownQuestion(QuestionId),

    #[error("Index {index} out of range for {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Guide file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse guide file: {0}")]
    Parse(String),

    #[error("Unsupported guide file format: {0}")]
    UnsupportedFormat(String),
}
