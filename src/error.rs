use thiserror::Error;

/// Fatal pipeline failures.
///
/// There is no local recovery: every variant aborts the current run and the
/// caller decides whether to retry the whole video. Messages are surfaced
/// verbatim in the failure report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The video container could not be opened or decoded, or has no frames.
    #[error("media open failed: {0}")]
    MediaOpen(String),

    /// A detector call failed. No partial report is emitted.
    #[error("detection failed: {0}")]
    Detection(String),

    /// A snapshot could not be written to durable storage.
    #[error("snapshot storage failed: {0}")]
    Storage(String),

    /// A finished report violated one of its own invariants.
    #[error("report invariant violated: {0}")]
    Invariant(String),
}

impl PipelineError {
    pub fn media_open(msg: impl Into<String>) -> Self {
        Self::MediaOpen(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
