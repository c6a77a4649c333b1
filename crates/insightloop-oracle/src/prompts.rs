use crate::{DecisionRequest, ExtractionSource};

/// System instruction given to the decision oracle
pub const INTERVIEWER_INSTRUCTION: &str = r#"You are a world-class qualitative research interviewer.
Your goal is to elicit deep, detailed, and meaningful insights from the respondent.

STRATEGY:
1. Use the provided "Core Questions" as your primary milestones, in order.
2. If the latest answer is shallow, generate a probing follow-up on the same topic (isProbe = true).
   Prefer the predefined probes of the current core question when they fit.
3. Do not move to the next core question until the current topic is explored.
4. When every core question has been explored, set topicExhausted = true."#;

/// Prompt templates for the oracles
pub struct OraclePrompts;

impl OraclePrompts {
    /// Build the user content for a decision call
    pub fn build_decision_prompt(request: &DecisionRequest) -> String {
        let core_questions =
            serde_json::to_string(&request.core_questions).unwrap_or_else(|_| "[]".to_string());
        let history = serde_json::to_string(&request.history).unwrap_or_else(|_| "[]".to_string());

        format!(
            "STUDY GOAL: {goal}\nCORE QUESTIONS: {core_questions}\nHISTORY: {history}",
            goal = request.goal,
        )
    }

    /// Build a self-contained decision prompt for backends without a system slot
    pub fn build_standalone_decision_prompt(request: &DecisionRequest) -> String {
        format!(
            r#"{instruction}

{body}

## Required Response Format

Respond with a single JSON object and nothing else:
{{"nextQuestion": "string", "isProbe": true|false, "topicExhausted": true|false, "reasoning": "string"}}"#,
            instruction = INTERVIEWER_INSTRUCTION,
            body = Self::build_decision_prompt(request),
        )
    }

    /// Build the extraction instruction, with the document inlined for text sources
    pub fn build_extraction_prompt(source: &ExtractionSource) -> String {
        let instruction = r#"Extract a structured qualitative research interview guide from this document.
Identify the core questions and any specific follow-up probes.
Top-level entries are core questions; entries nested directly under one are its probes, in source order.
Ignore administrative or logistical text such as names, dates, and boilerplate.
Return an array of objects with 'text' (string) and 'predefinedProbes' (array of strings)."#;

        match source {
            ExtractionSource::Text(text) => format!("{}\n\nDocument:\n{}", instruction, text),
            ExtractionSource::Document { .. } => instruction.to_string(),
        }
    }
}
