use thiserror::Error;

/// Failures that end an invocation early. Rejected actors and file comments
/// are expected input and surface as an `Outcome` instead.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("'{path}' does not exist at {git_ref}")]
    ContentNotFound { path: String, git_ref: String },

    #[error("completion failed after {attempts} attempt(s); last response: {last_response}")]
    CompletionFailed {
        attempts: usize,
        last_response: String,
    },

    #[error("GitHub API error ({status}): {body}")]
    GitHub { status: u16, body: String },

    #[error("invalid event payload: {0}")]
    InvalidEvent(String),
}
