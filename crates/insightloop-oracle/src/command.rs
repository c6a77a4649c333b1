use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::decision::parse_outlines;
use crate::prompts::OraclePrompts;
use crate::{
    DecisionOracle, DecisionRequest, ExtractionOracle, ExtractionSource, OracleDecision,
    OracleError, ProcessSpawner, QuestionOutline,
};

/// Oracle backed by an external CLI that prints its answer to stdout.
///
/// The default binary is `claude`, invoked as `claude --print -- <prompt>`.
pub struct CommandOracle {
    binary_path: PathBuf,
    args: Vec<String>,
    model: Option<String>,
}

impl CommandOracle {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
            args: vec!["--print".to_string()],
            model: None,
        }
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = path;
        self
    }

    /// Replace the fixed arguments placed before the prompt
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn run(&self, prompt: &str) -> Result<String, OracleError> {
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();

        if let Some(ref model) = self.model {
            args.push("--model");
            args.push(model);
        }

        // Prompts may start with '-', so end option parsing first
        args.push("--");
        args.push(prompt);

        let output = ProcessSpawner::spawn(&self.binary_path, &args).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Oracle command completed"
        );

        if !output.success() {
            return Err(OracleError::Unavailable(format!(
                "{} exited with code {}: {}",
                self.binary_path.display(),
                output.exit_code,
                output.stderr.lines().last().unwrap_or_default()
            )));
        }

        Ok(output.stdout)
    }
}

impl Default for CommandOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionOracle for CommandOracle {
    fn name(&self) -> &str {
        "Command"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<OracleDecision, OracleError> {
        let prompt = OraclePrompts::build_standalone_decision_prompt(request);
        debug!(prompt_len = prompt.len(), "Requesting decision from command");

        let stdout = self.run(&prompt).await?;
        OracleDecision::parse(&stdout).map_err(|e| OracleError::ResponseInvalid(e.to_string()))
    }
}

#[async_trait]
impl ExtractionOracle for CommandOracle {
    fn name(&self) -> &str {
        "Command"
    }

    async fn extract(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<QuestionOutline>, OracleError> {
        let ExtractionSource::Text(_) = source else {
            return Err(OracleError::ExtractionFailed(format!(
                "command oracle cannot read binary documents ({})",
                source.describe()
            )));
        };

        let prompt = OraclePrompts::build_extraction_prompt(source);
        let stdout = self
            .run(&prompt)
            .await
            .map_err(|e| OracleError::ExtractionFailed(e.to_string()))?;

        parse_outlines(&stdout).map_err(|e| OracleError::ExtractionFailed(e.to_string()))
    }
}
