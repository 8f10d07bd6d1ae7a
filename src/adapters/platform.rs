use crate::core::ReviewCommentEvent;
use anyhow::Result;
use async_trait::async_trait;

/// Reads repository files as they existed at a given commit.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn get_content(&self, owner: &str, repo: &str, path: &str, git_ref: &str)
        -> Result<String>;
}

/// Write access to the review thread a comment belongs to.
#[async_trait]
pub trait ReviewThread: Send + Sync {
    async fn create_reaction(&self, event: &ReviewCommentEvent, content: &str) -> Result<()>;

    /// Posts `body` as a reply threaded under the event's comment.
    async fn create_reply(&self, event: &ReviewCommentEvent, body: &str) -> Result<()>;
}

/// Resolves a human-readable link to the job that is handling the event.
#[async_trait]
pub trait DiagnosticsLinkProvider: Send + Sync {
    async fn job_link(&self, event: &ReviewCommentEvent) -> Result<String>;
}
