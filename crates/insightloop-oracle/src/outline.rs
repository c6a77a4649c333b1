//! Offline oracle that reads plain-text outlines without a model.
//!
//! Top-level list entries become core questions. Entries indented under a
//! core entry, bulleted under a numbered one, or labelled `Probe:` become its
//! probes. Headings, `Name:`/`Date:` fields and boilerplate prose are dropped.
//!
//! It never makes interview decisions; `decide` always reports the oracle as
//! unavailable so sessions advance through their core questions verbatim.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    DecisionOracle, DecisionRequest, ExtractionOracle, ExtractionSource, OracleDecision,
    OracleError, QuestionOutline,
};

const ADMIN_LABELS: &[&str] = &[
    "name",
    "date",
    "time",
    "location",
    "venue",
    "interviewer",
    "moderator",
    "respondent",
    "participant",
    "study",
    "project",
    "duration",
    "version",
    "note",
    "notes",
    "client",
    "id",
];

const BOILERPLATE_PREFIXES: &[&str] = &[
    "introduction",
    "intro",
    "welcome",
    "thank you",
    "thanks",
    "consent",
    "closing",
    "wrap up",
    "wrap-up",
    "end of",
    "section",
    "part ",
];

const PROMPT_VERBS: &[&str] = &[
    "tell", "describe", "explain", "walk", "share", "talk", "imagine", "think", "recall", "list",
];

const PROBE_LABELS: &[&str] = &["probe", "probes", "follow-up", "follow up", "followup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Numbered,
    Lettered,
    Bullet,
    None,
}

#[derive(Debug)]
struct OutlineLine<'a> {
    indent: usize,
    marker: Marker,
    text: &'a str,
}

/// Deterministic outline reader
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlineOracle;

impl OutlineOracle {
    pub fn new() -> Self {
        Self
    }

    /// Read an outline into core questions with nested probes
    pub fn read_outline(text: &str) -> Vec<QuestionOutline> {
        let mut questions: Vec<QuestionOutline> = Vec::new();
        let mut core_indent = 0usize;
        let mut core_marker = Marker::None;

        for raw in text.lines() {
            let Some(line) = classify(raw) else {
                continue;
            };

            let (text, labelled_probe) = strip_probe_label(line.text);
            let text = text.trim();
            if text.is_empty() || is_administrative(text, line.marker) {
                continue;
            }

            let nested = !questions.is_empty()
                && (labelled_probe
                    || line.indent > core_indent
                    || is_subordinate(core_marker, line.marker));

            if nested {
                if let Some(current) = questions.last_mut() {
                    current.predefined_probes.push(text.to_string());
                }
            } else {
                core_indent = line.indent;
                core_marker = line.marker;
                questions.push(QuestionOutline::new(text));
            }
        }

        debug!(questions = questions.len(), "Read outline");
        questions
    }
}

#[async_trait]
impl DecisionOracle for OutlineOracle {
    fn name(&self) -> &str {
        "Offline"
    }

    async fn decide(&self, _request: &DecisionRequest) -> Result<OracleDecision, OracleError> {
        Err(OracleError::Unavailable(
            "offline oracle does not make interview decisions".to_string(),
        ))
    }
}

#[async_trait]
impl ExtractionOracle for OutlineOracle {
    fn name(&self) -> &str {
        "Offline"
    }

    async fn extract(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<QuestionOutline>, OracleError> {
        match source {
            ExtractionSource::Text(text) => {
                let questions = Self::read_outline(text);
                if questions.is_empty() {
                    Err(OracleError::ExtractionFailed(
                        "no questions found in the supplied text".to_string(),
                    ))
                } else {
                    Ok(questions)
                }
            }
            ExtractionSource::Document { .. } => Err(OracleError::ExtractionFailed(format!(
                "offline oracle cannot read binary documents ({})",
                source.describe()
            ))),
        }
    }
}

fn classify(raw: &str) -> Option<OutlineLine<'_>> {
    let indent = raw
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (marker, text) = strip_marker(trimmed);
    Some(OutlineLine {
        indent,
        marker,
        text,
    })
}

fn strip_marker(line: &str) -> (Marker, &str) {
    for bullet in ['-', '*', '•', '◦', '▪', '–', '—', '+'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            if rest.starts_with(char::is_whitespace) {
                return (Marker::Bullet, rest.trim_start());
            }
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = strip_list_terminator(&line[digits..]) {
            return (Marker::Numbered, rest);
        }
    }

    // "Q1." / "Q1:" style numbering
    if let Some(rest) = line.strip_prefix(['Q', 'q']) {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            if let Some(rest) = strip_list_terminator(&rest[digits..]) {
                return (Marker::Numbered, rest);
            }
        }
    }

    let mut chars = line.chars();
    if let (Some(letter), Some(term)) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() && (term == '.' || term == ')') {
            let rest = chars.as_str();
            if rest.starts_with(char::is_whitespace) {
                return (Marker::Lettered, rest.trim_start());
            }
        }
    }

    (Marker::None, line)
}

fn strip_list_terminator(rest: &str) -> Option<&str> {
    let rest = rest.strip_prefix(['.', ')', ':'])?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn strip_probe_label(text: &str) -> (&str, bool) {
    let lower = text.to_lowercase();
    for label in PROBE_LABELS {
        if lower.starts_with(label) {
            let Some(rest) = text.get(label.len()..) else {
                continue;
            };
            if let Some(rest) = rest.trim_start().strip_prefix(':') {
                return (rest, true);
            }
        }
    }
    (text, false)
}

/// Bullets and letters sit beneath numbered entries
fn is_subordinate(core: Marker, line: Marker) -> bool {
    matches!(
        (core, line),
        (Marker::Numbered, Marker::Bullet | Marker::Lettered)
    )
}

fn is_administrative(text: &str, marker: Marker) -> bool {
    let lower = text.to_lowercase();
    let is_question = text.ends_with('?');

    if let Some((label, _)) = lower.split_once(':') {
        if ADMIN_LABELS.contains(&label.trim()) {
            return true;
        }
    }

    if !is_question && text.ends_with(':') {
        return true;
    }

    if !is_question && BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }

    if marker == Marker::None && !is_question {
        let first_word = lower
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .unwrap_or_default();
        return !PROMPT_VERBS.contains(&first_word);
    }

    false
}
