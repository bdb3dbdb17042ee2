use thiserror::Error;

/// Errors that escape the loop. Almost everything in this crate degrades
/// to a negative result value instead; what raises here is limited to
/// conditions the loop cannot mask: a dead browser handle, an unreachable
/// inference endpoint, or broken construction.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The browser or page handle is gone. Continuing without a valid
    /// handle cannot produce meaningful results, so this propagates.
    #[error("browser session error: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("inference request failed: {0}")]
    Inference(#[from] reqwest::Error),

    #[error("inference endpoint returned {status}: {message}")]
    InferenceStatus { status: u16, message: String },

    #[error("inference response carried no completion text")]
    EmptyCompletion,

    #[error("missing configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
