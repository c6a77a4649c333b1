//! # insightloop-guide
//!
//! The interview guide: a study's name, research goal and ordered core
//! questions, plus the tooling that builds one.
//!
//! - [`StudyConfig`] - the validated guide a session runs from
//! - [`GuideDraft`] - operator-side editing (add, reorder, probes, extraction)
//! - [`GuideStructurer`] - extraction of outlines through an oracle

mod draft;
mod error;
mod file;
mod model;
mod structuring;

pub use draft::GuideDraft;
pub use error::GuideError;
pub use file::GuideFormat;
pub use model::{CoreQuestion, QuestionId, StudyConfig};
pub use structuring::GuideStructurer;
