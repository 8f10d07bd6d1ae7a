use crate::adapters::platform::ContentFetcher;
use crate::core::event::{ReviewCommentEvent, Side};
use anyhow::Result;
use tracing::debug;

/// Works out which code the commenter selected in the diff view.
pub struct SelectionResolver<'a> {
    fetcher: &'a dyn ContentFetcher,
}

impl<'a> SelectionResolver<'a> {
    pub fn new(fetcher: &'a dyn ContentFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, event: &ReviewCommentEvent) -> Result<String> {
        // A selection running from removed lines into added lines has no
        // single revision to slice, so hand over the hunk as shown.
        if event.spans_both_sides() {
            debug!("Selection spans both sides, using diff hunk");
            return Ok(event.diff_hunk.clone());
        }

        let git_ref = match event.side {
            Some(Side::Left) => &event.base_sha,
            _ => &event.head_sha,
        };

        let Some(end) = event.line else {
            return Ok(String::new());
        };
        let start = event.start_line.unwrap_or(end);
        debug!(path = %event.path, git_ref = %git_ref, start, end, "Slicing selection");

        let content = self
            .fetcher
            .get_content(&event.owner, &event.repo, &event.path, git_ref)
            .await?;

        Ok(slice_lines(&content, start, end))
    }
}

/// Returns lines `start..=end` (1-based) of `content`. Out-of-range bounds
/// truncate instead of failing.
pub fn slice_lines(content: &str, start: usize, end: usize) -> String {
    let skip = start.saturating_sub(1);
    let take = end.saturating_sub(skip);
    content
        .split('\n')
        .skip(skip)
        .take(take)
        .collect::<Vec<_>>()
        .join("\n")
}
