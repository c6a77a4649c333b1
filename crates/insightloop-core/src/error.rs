use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("Guide is not ready for an interview: {0}")]
    InvalidGuide(#[from] insightloop_guide::GuideError),

    #[error("Interview is already complete")]
    SessionComplete,
}
