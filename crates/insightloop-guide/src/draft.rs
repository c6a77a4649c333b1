//! Editable guide under construction.
//!
//! A [`GuideDraft`] tolerates incomplete state (blank questions, missing
//! goal) while the operator works on it; [`GuideDraft::finalize`] is the
//! only way out and enforces every [`StudyConfig`] invariant.

use tracing::debug;

use insightloop_oracle::QuestionOutline;

use crate::{CoreQuestion, GuideError, QuestionId, StudyConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideDraft {
    pub study_name: String,
    pub research_goal: String,
    questions: Vec<CoreQuestion>,
}

impl GuideDraft {
    pub fn new(study_name: impl Into<String>, research_goal: impl Into<String>) -> Self {
        Self {
            study_name: study_name.into(),
            research_goal: research_goal.into(),
            questions: Vec::new(),
        }
    }

    /// Reopen an existing guide for editing
    pub fn from_config(config: StudyConfig) -> Self {
        Self {
            study_name: config.study_name,
            research_goal: config.research_goal,
            questions: config.core_questions,
        }
    }

    pub fn questions(&self) -> &[CoreQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, id: &QuestionId) -> Option<&CoreQuestion> {
        self.questions.iter().find(|q| &q.id == id)
    }

    /// Append a blank-probed question and return its id
    pub fn add_question(&mut self, text: impl Into<String>) -> QuestionId {
        let id = self.fresh_id();
        self.questions.push(CoreQuestion {
            id: id.clone(),
            text: text.into(),
            predefined_probes: Vec::new(),
        });
        id
    }

    /// Append extracted outlines after any questions already present
    pub fn append_extracted(&mut self, outlines: Vec<QuestionOutline>) -> Vec<QuestionId> {
        let mut ids = Vec::with_capacity(outlines.len());
        for outline in outlines {
            let id = self.fresh_id();
            self.questions
                .push(CoreQuestion::from_outline(id.clone(), outline));
            ids.push(id);
        }
        debug!(added = ids.len(), total = self.questions.len(), "Appended outlines");
        ids
    }

    pub fn update_text(&mut self, id: &QuestionId, text: impl Into<String>) -> Result<(), GuideError> {
        self.question_mut(id)?.text = text.into();
        Ok(())
    }

    pub fn set_probes(&mut self, id: &QuestionId, probes: Vec<String>) -> Result<(), GuideError> {
        self.question_mut(id)?.predefined_probes = probes;
        Ok(())
    }

    pub fn add_probe(&mut self, id: &QuestionId, probe: impl Into<String>) -> Result<(), GuideError> {
        self.question_mut(id)?.predefined_probes.push(probe.into());
        Ok(())
    }

    pub fn remove_probe(&mut self, id: &QuestionId, index: usize) -> Result<String, GuideError> {
        let probes = &mut self.question_mut(id)?.predefined_probes;
        if index >= probes.len() {
            return Err(GuideError::IndexOutOfRange {
                index,
                len: probes.len(),
            });
        }
        Ok(probes.remove(index))
    }

    pub fn remove_question(&mut self, id: &QuestionId) -> Result<CoreQuestion, GuideError> {
        let position = self.position(id)?;
        Ok(self.questions.remove(position))
    }

    /// Move the question at `from` so that it ends up at index `to`
    pub fn move_question(&mut self, from: usize, to: usize) -> Result<(), GuideError> {
        let len = self.questions.len();
        for index in [from, to] {
            if index >= len {
                return Err(GuideError::IndexOutOfRange { index, len });
            }
        }

        let question = self.questions.remove(from);
        self.questions.insert(to, question);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), GuideError> {
        self.snapshot().validate()
    }

    /// Produce the immutable configuration a session runs from
    pub fn finalize(&self) -> Result<StudyConfig, GuideError> {
        let config = self.snapshot();
        config.validate()?;
        Ok(config)
    }

    fn snapshot(&self) -> StudyConfig {
        StudyConfig::new(
            self.study_name.clone(),
            self.research_goal.clone(),
            self.questions.clone(),
        )
    }

    fn position(&self, id: &QuestionId) -> Result<usize, GuideError> {
        self.questions
            .iter()
            .position(|q| &q.id == id)
            .ok_or_else(|| GuideError::UnknownQuestion(id.clone()))
    }

    fn question_mut(&mut self, id: &QuestionId) -> Result<&mut CoreQuestion, GuideError> {
        let position = self.position(id)?;
        Ok(&mut self.questions[position])
    }

    fn fresh_id(&self) -> QuestionId {
        loop {
            let id = QuestionId::generate();
            if self.question(&id).is_none() {
                return id;
            }
        }
    }
}
