use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::QuestionOutline;

/// The oracle's verdict after reading the latest answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleDecision {
    /// The question to ask next (ignored when the topic is exhausted)
    pub next_question: String,
    /// Whether the next question is a follow-up on the current topic
    pub is_probe: bool,
    /// Whether the interview has nothing left to explore
    pub topic_exhausted: bool,
    /// Free-text rationale, kept for diagnostics only
    pub reasoning: String,
}

#[derive(Error, Debug)]
pub enum DecisionParseError {
    #[error("No JSON payload found in oracle output")]
    NoPayloadFound,

    #[error("Failed to parse oracle JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid decision format: {0}")]
    InvalidFormat(String),
}

/// Raw decision shape: every field optional so we can name what is missing
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDecision {
    next_question: Option<String>,
    is_probe: Option<bool>,
    topic_exhausted: Option<bool>,
    reasoning: Option<String>,
}

/// Raw extraction item, tolerant of `null` probes
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutline {
    text: Option<String>,
    #[serde(default)]
    predefined_probes: Option<Vec<String>>,
}

impl OracleDecision {
    /// Parse a decision from oracle output.
    ///
    /// Accepts a bare JSON object, a fenced ```json block, or an object
    /// embedded in surrounding prose. All four fields are required.
    pub fn parse(output: &str) -> Result<Self, DecisionParseError> {
        debug!(output_len = output.len(), "Parsing oracle decision");

        let json = extract_json(output, '{', '}').ok_or(DecisionParseError::NoPayloadFound)?;
        let raw: RawDecision = serde_json::from_str(json)?;

        let mut missing = Vec::new();
        if raw.next_question.is_none() {
            missing.push("nextQuestion");
        }
        if raw.is_probe.is_none() {
            missing.push("isProbe");
        }
        if raw.topic_exhausted.is_none() {
            missing.push("topicExhausted");
        }
        if raw.reasoning.is_none() {
            missing.push("reasoning");
        }

        match (raw.next_question, raw.is_probe, raw.topic_exhausted, raw.reasoning) {
            (Some(next_question), Some(is_probe), Some(topic_exhausted), Some(reasoning)) => {
                if !topic_exhausted && next_question.trim().is_empty() {
                    return Err(DecisionParseError::InvalidFormat(
                        "nextQuestion is empty but the topic is not exhausted".to_string(),
                    ));
                }
                Ok(Self {
                    next_question: next_question.trim().to_string(),
                    is_probe,
                    topic_exhausted,
                    reasoning,
                })
            }
            _ => Err(DecisionParseError::InvalidFormat(format!(
                "missing required field(s): {}",
                missing.join(", ")
            ))),
        }
    }

    /// Get a short description of the decision for logging
    pub fn short_description(&self) -> String {
        if self.topic_exhausted {
            "FINISH".to_string()
        } else if self.is_probe {
            "PROBE".to_string()
        } else {
            "ADVANCE".to_string()
        }
    }
}

/// Parse an extraction payload: a JSON array of `{text, predefinedProbes}`.
///
/// An entry without `text` fails the whole parse. Blank questions and blank
/// probes are dropped; text is trimmed.
pub fn parse_outlines(output: &str) -> Result<Vec<QuestionOutline>, DecisionParseError> {
    debug!(output_len = output.len(), "Parsing extracted guide");

    let json = extract_json(output, '[', ']').ok_or(DecisionParseError::NoPayloadFound)?;
    let raw: Vec<RawOutline> = serde_json::from_str(json)?;

    let mut outlines = Vec::with_capacity(raw.len());
    for (index, item) in raw.into_iter().enumerate() {
        let Some(text) = item.text else {
            return Err(DecisionParseError::InvalidFormat(format!(
                "entry {} has no text",
                index
            )));
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let predefined_probes = item
            .predefined_probes
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        outlines.push(QuestionOutline {
            text,
            predefined_probes,
        });
    }

    Ok(outlines)
}

/// Locate the outermost JSON value delimited by `open`/`close`
fn extract_json(output: &str, open: char, close: char) -> Option<&str> {
    let trimmed = output.trim();
    let body = strip_code_fence(trimmed).unwrap_or(trimmed);

    let start = body.find(open)?;
    let end = body.rfind(close)?;
    if start < end {
        Some(&body[start..=end])
    } else {
        None
    }
}

fn strip_code_fence(output: &str) -> Option<&str> {
    let start = output.find("```")?;
    let after = &output[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
