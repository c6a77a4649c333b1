use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether an interview step asks a core question or a follow-up probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Core,
    Probe,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Core => write!(f, "core"),
            StepKind::Probe => write!(f, "probe"),
        }
    }
}

/// A core question as the oracle sees it (no identifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutline {
    pub text: String,
    #[serde(default)]
    pub predefined_probes: Vec<String>,
}

impl QuestionOutline {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            predefined_probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: impl Into<String>) -> Self {
        self.predefined_probes.push(probe.into());
        self
    }
}

/// One asked (and possibly answered) step of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: StepKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Everything the decision oracle needs to choose the next move
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub goal: String,
    pub core_questions: Vec<QuestionOutline>,
    pub history: Vec<HistoryEntry>,
}

/// Source material for guide extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Pasted or typed guide text
    Text(String),
    /// Opaque document payload with a declared media type
    Document { media_type: String, bytes: Vec<u8> },
}

/// Wire form of a document payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDocument {
    pub media_type: String,
    pub bytes: String,
}

impl ExtractionSource {
    pub fn text(text: impl Into<String>) -> Self {
        ExtractionSource::Text(text.into())
    }

    pub fn document(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ExtractionSource::Document {
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Load a source from disk. Plain-text files become `Text`, anything else
    /// is sent as a document with a media type inferred from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "md" | "markdown" | "text" => {
                Ok(ExtractionSource::Text(std::fs::read_to_string(path)?))
            }
            _ => Ok(ExtractionSource::Document {
                media_type: media_type_for(&extension).to_string(),
                bytes: std::fs::read(path)?,
            }),
        }
    }

    /// Base64 wire payload for document sources
    pub fn inline_document(&self) -> Option<InlineDocument> {
        match self {
            ExtractionSource::Text(_) => None,
            ExtractionSource::Document { media_type, bytes } => Some(InlineDocument {
                media_type: media_type.clone(),
                bytes: STANDARD.encode(bytes),
            }),
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            ExtractionSource::Text(text) => format!("text ({} chars)", text.chars().count()),
            ExtractionSource::Document { media_type, bytes } => {
                format!("{} ({} bytes)", media_type, bytes.len())
            }
        }
    }
}

fn media_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "rtf" => "application/rtf",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_request_wire_shape() {
        let request = DecisionRequest {
            goal: "Understand commuting".into(),
            core_questions: vec![QuestionOutline::new("How do you travel?").with_probe("Why?")],
            history: vec![HistoryEntry {
                kind: StepKind::Core,
                question: "How do you travel?".into(),
                response: None,
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["goal"], "Understand commuting");
        assert_eq!(value["coreQuestions"][0]["predefinedProbes"][0], "Why?");
        assert_eq!(value["history"][0]["kind"], "core");
        assert!(value["history"][0].get("response").is_none());
    }

    #[test]
    fn test_inline_document_is_base64() {
        let source = ExtractionSource::document("application/pdf", b"%PDF".to_vec());
        let inline = source.inline_document().unwrap();
        assert_eq!(inline.media_type, "application/pdf");
        assert_eq!(inline.bytes, "JVBERg==");
        assert!(ExtractionSource::text("hi").inline_document().is_none());
    }

    #[test]
    fn test_from_path_infers_kind() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path();

        let text_path = dir.join("guide.md");
        std::fs::write(&text_path, "1. Hello?").unwrap();
        assert_eq!(
            ExtractionSource::from_path(&text_path).unwrap(),
            ExtractionSource::Text("1. Hello?".into())
        );

        let pdf_path = dir.join("guide.PDF");
        std::fs::write(&pdf_path, [1u8, 2, 3]).unwrap();
        match ExtractionSource::from_path(&pdf_path).unwrap() {
            ExtractionSource::Document { media_type, bytes } => {
                assert_eq!(media_type, "application/pdf");
                assert_eq!(bytes, vec![1, 2, 3]);
            }
            other => panic!("expected document, got {:?}", other),
        }
    }
}
