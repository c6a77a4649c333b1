use tracing::{info, warn};

use insightloop_oracle::{ExtractionOracle, ExtractionSource, QuestionOutline};

use crate::{GuideDraft, GuideError, QuestionId};

/// Turns unstructured guide material into ordered question outlines.
///
/// Identifiers are not assigned here; callers attach them when the outlines
/// land in a [`GuideDraft`].
pub struct GuideStructurer<'a> {
    oracle: &'a dyn ExtractionOracle,
}

impl<'a> GuideStructurer<'a> {
    pub fn new(oracle: &'a dyn ExtractionOracle) -> Self {
        Self { oracle }
    }

    pub async fn extract_questions(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<QuestionOutline>, GuideError> {
        info!(
            oracle = self.oracle.name(),
            source = %source.describe(),
            "Extracting guide questions"
        );

        let outlines = self.oracle.extract(source).await.map_err(|e| {
            warn!(error = %e, "Guide extraction failed");
            GuideError::ExtractionFailed(e.to_string())
        })?;

        if outlines.is_empty() {
            warn!("Extraction returned no questions");
        }

        Ok(outlines)
    }

    /// Extract and append to `draft`; on failure the draft is untouched
    pub async fn extract_into(
        &self,
        draft: &mut GuideDraft,
        source: &ExtractionSource,
    ) -> Result<Vec<QuestionId>, GuideError> {
        let outlines = self.extract_questions(source).await?;
        Ok(draft.append_extracted(outlines))
    }
}
