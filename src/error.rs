use thiserror::Error;

/// Pressure pipeline error types
///
/// None of these escape the pipeline boundary: the matcher turns them into
/// match tiers and the pipeline turns them into tagged outcomes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid hardware spec '{id}': {reason}")]
    InvalidSpec { id: String, reason: String },

    #[error("Input is not valid UTF-8 (first bad byte at {0})")]
    Encoding(usize),

    #[error("Input could not be introspected: {0}")]
    Introspection(String),

    #[error("No frames could be parsed: {0}")]
    NoFrames(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Result type for pipeline internals
pub type PResult<T> = Result<T, PipelineError>;
