//! Gemini backend - `generateContent` over HTTP with JSON response schemas.
//!
//! Both oracle contracts map onto one endpoint:
//!
//! ```text
//! POST {base_url}/models/{model}:generateContent?key=...
//! ```
//!
//! Decisions request an object schema with all four fields required;
//! extraction requests an array of `{text, predefinedProbes}`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::decision::parse_outlines;
use crate::prompts::{OraclePrompts, INTERVIEWER_INSTRUCTION};
use crate::{
    DecisionOracle, DecisionRequest, ExtractionOracle, ExtractionSource, OracleDecision,
    OracleError, QuestionOutline,
};

/// Configuration for the Gemini backend.
#[derive(Debug)]
pub struct GeminiConfig {
    api_key: SecretString,
    /// Model to use
    pub model: String,
    /// Base URL for the API
    pub base_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read the API key from the first set, non-empty environment variable
    pub fn from_env(vars: &[&str]) -> Result<Self, OracleError> {
        vars.iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty() && value != "undefined")
            .map(Self::new)
            .ok_or_else(|| {
                OracleError::Config(format!(
                    "API key is missing; set one of: {}",
                    vars.join(", ")
                ))
            })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Gemini-backed decision and extraction oracle
pub struct GeminiOracle {
    config: GeminiConfig,
    client: Client,
}

impl GeminiOracle {
    pub fn new(config: GeminiConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    async fn generate(&self, body: &GenerateRequest) -> Result<String, OracleError> {
        debug!(model = %self.config.model, "Calling generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout)
                } else if e.is_connect() {
                    OracleError::Unavailable(format!("Connection failed: {}", e))
                } else {
                    OracleError::Unavailable(e.to_string())
                }
            })?;

        let response = Self::check_status(response).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::ResponseInvalid(format!("Failed to parse response: {}", e)))?;

        parsed.text().ok_or_else(|| {
            OracleError::ResponseInvalid("Response contained no candidate text".to_string())
        })
    }

    async fn check_status(response: Response) -> Result<Response, OracleError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => OracleError::Unavailable(format!("Authentication failed: {}", body)),
            429 => OracleError::Unavailable("Rate limited".to_string()),
            500..=599 => OracleError::Unavailable(format!("Server error {}: {}", status, body)),
            _ => OracleError::Unavailable(format!("Unexpected status {}: {}", status, body)),
        })
    }

    fn decision_request(request: &DecisionRequest) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Some(Content::text(INTERVIEWER_INSTRUCTION)),
            contents: vec![Content::text(&OraclePrompts::build_decision_prompt(request))],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: decision_schema(),
            },
        }
    }

    fn extraction_request(source: &ExtractionSource) -> GenerateRequest {
        let mut parts = vec![Part::Text {
            text: OraclePrompts::build_extraction_prompt(source),
        }];
        if let Some(inline) = source.inline_document() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: inline.media_type,
                    data: inline.bytes,
                },
            });
        }

        GenerateRequest {
            system_instruction: None,
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: extraction_schema(),
            },
        }
    }
}

#[async_trait]
impl DecisionOracle for GeminiOracle {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<OracleDecision, OracleError> {
        let text = self.generate(&Self::decision_request(request)).await?;
        let decision = OracleDecision::parse(&text)
            .map_err(|e| OracleError::ResponseInvalid(e.to_string()))?;

        info!(decision = %decision.short_description(), "Gemini decision received");
        Ok(decision)
    }
}

#[async_trait]
impl ExtractionOracle for GeminiOracle {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn extract(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<QuestionOutline>, OracleError> {
        let text = self
            .generate(&Self::extraction_request(source))
            .await
            .map_err(|e| OracleError::ExtractionFailed(e.to_string()))?;

        parse_outlines(&text).map_err(|e| OracleError::ExtractionFailed(e.to_string()))
    }
}

fn decision_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nextQuestion": { "type": "STRING" },
            "isProbe": { "type": "BOOLEAN" },
            "topicExhausted": { "type": "BOOLEAN" },
            "reasoning": { "type": "STRING" }
        },
        "required": ["nextQuestion", "isProbe", "topicExhausted", "reasoning"]
    })
}

fn extraction_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": { "type": "STRING" },
                "predefinedProbes": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["text", "predefinedProbes"]
        }
    })
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
