use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use insightloop_oracle::QuestionOutline;

use crate::GuideError;

/// Short opaque token identifying a core question within a guide
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Generate a fresh random 9-character identifier
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..9].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A primary interview topic with optional scripted follow-ups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreQuestion {
    #[serde(default = "QuestionId::generate")]
    pub id: QuestionId,
    pub text: String,
    #[serde(default, alias = "predefined_probes")]
    pub predefined_probes: Vec<String>,
}

impl CoreQuestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: QuestionId::generate(),
            text: text.into(),
            predefined_probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: impl Into<String>) -> Self {
        self.predefined_probes.push(probe.into());
        self
    }

    /// Attach an identifier to an extracted outline
    pub fn from_outline(id: QuestionId, outline: QuestionOutline) -> Self {
        Self {
            id,
            text: outline.text,
            predefined_probes: outline.predefined_probes,
        }
    }

    /// The identifier-free view sent to oracles
    pub fn to_outline(&self) -> QuestionOutline {
        QuestionOutline {
            text: self.text.clone(),
            predefined_probes: self.predefined_probes.clone(),
        }
    }
}

/// A study's configuration: what to learn and which questions to ask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyConfig {
    #[serde(alias = "study_name")]
    pub study_name: String,
    #[serde(alias = "research_goal")]
    pub research_goal: String,
    #[serde(default, alias = "core_questions")]
    pub core_questions: Vec<CoreQuestion>,
}

impl StudyConfig {
    pub fn new(
        study_name: impl Into<String>,
        research_goal: impl Into<String>,
        core_questions: Vec<CoreQuestion>,
    ) -> Self {
        Self {
            study_name: study_name.into(),
            research_goal: research_goal.into(),
            core_questions,
        }
    }

    /// Check the invariants required before a session may start
    pub fn validate(&self) -> Result<(), GuideError> {
        if self.study_name.trim().is_empty() {
            return Err(GuideError::EmptyStudyName);
        }
        if self.research_goal.trim().is_empty() {
            return Err(GuideError::EmptyResearchGoal);
        }
        if self.core_questions.is_empty() {
            return Err(GuideError::EmptyGuide);
        }

        let mut seen = HashSet::new();
        for (position, question) in self.core_questions.iter().enumerate() {
            if question.text.trim().is_empty() {
                return Err(GuideError::EmptyQuestion {
                    position: position + 1,
                });
            }
            if !seen.insert(&question.id) {
                return Err(GuideError::DuplicateId(question.id.clone()));
            }
        }

        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.core_questions.len()
    }

    pub fn outlines(&self) -> Vec<QuestionOutline> {
        self.core_questions.iter().map(CoreQuestion::to_outline).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(questions: Vec<CoreQuestion>) -> StudyConfig {
        StudyConfig::new("Commute Study", "Understand commuting pain", questions)
    }

    #[test]
    fn test_generated_ids_are_short_and_distinct() {
        let a = QuestionId::generate();
        let b = QuestionId::generate();
        assert_eq!(a.as_str().len(), 9);
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_accepts_complete_guide() {
        let guide = config(vec![CoreQuestion::new("How do you travel?").with_probe("Why?")]);
        assert!(guide.validate().is_ok());
        assert_eq!(guide.outlines()[0].predefined_probes, vec!["Why?"]);
    }

    #[test]
    fn test_validate_rejects_empty_guides() {
        assert!(matches!(
            config(vec![]).validate(),
            Err(GuideError::EmptyGuide)
        ));
        assert!(matches!(
            config(vec![CoreQuestion::new("Q1"), CoreQuestion::new("   ")]).validate(),
            Err(GuideError::EmptyQuestion { position: 2 })
        ));
        assert!(matches!(
            StudyConfig::new(" ", "goal", vec![CoreQuestion::new("Q")]).validate(),
            Err(GuideError::EmptyStudyName)
        ));
        assert!(matches!(
            StudyConfig::new("name", "", vec![CoreQuestion::new("Q")]).validate(),
            Err(GuideError::EmptyResearchGoal)
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut second = CoreQuestion::new("Q2");
        let first = CoreQuestion::new("Q1");
        second.id = first.id.clone();

        assert!(matches!(
            config(vec![first, second]).validate(),
            Err(GuideError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_deserialize_generates_missing_ids() {
        let json = r#"{"studyName":"S","researchGoal":"G","coreQuestions":[{"text":"Q1"},{"text":"Q2","predefinedProbes":["P"]}]}"#;
        let guide: StudyConfig = serde_json::from_str(json).unwrap();

        assert_eq!(guide.question_count(), 2);
        assert_ne!(guide.core_questions[0].id, guide.core_questions[1].id);
        assert_eq!(guide.core_questions[1].predefined_probes, vec!["P"]);
        assert!(guide.validate().is_ok());
    }
}
