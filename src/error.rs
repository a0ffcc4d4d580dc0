use thiserror::Error;

/// Result type for stream stage operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can surface at the boundary of a running pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage callback returned an error
    #[error("Stage execution failed: {0}")]
    StageError(String),

    /// A stage callback panicked
    #[error("Stage panicked: {0}")]
    StagePanicked(String),

    /// Thread join error
    #[error("Thread join error: {0}")]
    ThreadError(String),
}
