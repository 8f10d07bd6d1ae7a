use crate::core::error::BotError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which version of the file a diff line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// The base revision (removed lines).
    Left,
    /// The head revision (added lines).
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[default]
    Line,
    File,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Line => "line",
            SubjectType::File => "file",
        }
    }
}

/// A "review comment created" notification, flattened to the fields the bot reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCommentEvent {
    pub actor: String,
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
    pub head_sha: String,
    pub base_sha: String,
    pub path: String,
    pub comment_id: u64,
    pub body: String,
    pub side: Option<Side>,
    pub start_side: Option<Side>,
    pub line: Option<usize>,
    pub start_line: Option<usize>,
    pub diff_hunk: String,
    pub subject_type: SubjectType,
}

#[derive(Deserialize)]
struct EventPayload {
    comment: RawComment,
    pull_request: RawPullRequest,
    repository: RawRepository,
    sender: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawComment {
    id: u64,
    path: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    diff_hunk: String,
    side: Option<Side>,
    start_side: Option<Side>,
    line: Option<usize>,
    start_line: Option<usize>,
    #[serde(default)]
    subject_type: SubjectType,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: u64,
    head: RawCommitRef,
    base: RawCommitRef,
}

#[derive(Deserialize)]
struct RawCommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawUser,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

impl ReviewCommentEvent {
    /// Builds an event from a webhook payload. `actor` takes precedence over
    /// the payload's `sender`, matching how Actions reports the triggering user.
    pub fn from_payload(payload: &str, actor: Option<String>) -> Result<Self> {
        let raw: EventPayload =
            serde_json::from_str(payload).context("Failed to parse review comment event")?;

        let actor = actor
            .filter(|a| !a.trim().is_empty())
            .or_else(|| raw.sender.map(|s| s.login))
            .ok_or_else(|| BotError::InvalidEvent("no actor in payload or environment".into()))?;

        Ok(Self {
            actor,
            owner: raw.repository.owner.login,
            repo: raw.repository.name,
            pull_number: raw.pull_request.number,
            head_sha: raw.pull_request.head.sha,
            base_sha: raw.pull_request.base.sha,
            path: raw.comment.path,
            comment_id: raw.comment.id,
            body: raw.comment.body,
            side: raw.comment.side,
            start_side: raw.comment.start_side,
            line: raw.comment.line,
            start_line: raw.comment.start_line,
            diff_hunk: raw.comment.diff_hunk,
            subject_type: raw.comment.subject_type,
        })
    }

    pub async fn load(path: &Path, actor: Option<String>) -> Result<Self> {
        let payload = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event payload {}", path.display()))?;
        Self::from_payload(&payload, actor)
    }

    /// True when the selection starts on one side of the diff and ends on the other.
    pub fn spans_both_sides(&self) -> bool {
        matches!(self.start_side, Some(start) if Some(start) != self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAYLOAD: &str = r#"{
        "action": "created",
        "comment": {
            "id": 42,
            "path": "src/app.py",
            "body": "$ai explain this",
            "diff_hunk": "@@ -1,2 +1,2 @@\n-a = 0\n+a = 1",
            "side": "RIGHT",
            "start_side": null,
            "line": 10,
            "start_line": null,
            "subject_type": "line"
        },
        "pull_request": {
            "number": 7,
            "head": { "sha": "headsha" },
            "base": { "sha": "basesha" }
        },
        "repository": { "name": "widgets", "owner": { "login": "acme" } },
        "sender": { "login": "harupy" }
    }"#;

    #[test]
    fn parses_line_comment_payload() {
        let event = ReviewCommentEvent::from_payload(SAMPLE_PAYLOAD, None).unwrap();
        assert_eq!(event.actor, "harupy");
        assert_eq!(event.owner, "acme");
        assert_eq!(event.repo, "widgets");
        assert_eq!(event.pull_number, 7);
        assert_eq!(event.head_sha, "headsha");
        assert_eq!(event.base_sha, "basesha");
        assert_eq!(event.comment_id, 42);
        assert_eq!(event.side, Some(Side::Right));
        assert_eq!(event.start_side, None);
        assert_eq!(event.line, Some(10));
        assert_eq!(event.start_line, None);
        assert_eq!(event.subject_type, SubjectType::Line);
    }

    #[test]
    fn environment_actor_overrides_sender() {
        let event =
            ReviewCommentEvent::from_payload(SAMPLE_PAYLOAD, Some("someone".to_string())).unwrap();
        assert_eq!(event.actor, "someone");

        let event =
            ReviewCommentEvent::from_payload(SAMPLE_PAYLOAD, Some("  ".to_string())).unwrap();
        assert_eq!(event.actor, "harupy");
    }

    #[test]
    fn file_comments_have_no_line() {
        let payload = SAMPLE_PAYLOAD
            .replace(r#""line": 10"#, r#""line": null"#)
            .replace(r#""subject_type": "line""#, r#""subject_type": "file""#);
        let event = ReviewCommentEvent::from_payload(&payload, None).unwrap();
        assert_eq!(event.subject_type, SubjectType::File);
        assert_eq!(event.line, None);
    }

    #[test]
    fn missing_actor_is_rejected() {
        let payload = SAMPLE_PAYLOAD.replace(
            r#""sender": { "login": "harupy" }"#,
            r#""sender": null"#,
        );
        let err = ReviewCommentEvent::from_payload(&payload, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BotError>(),
            Some(BotError::InvalidEvent(_))
        ));
    }

    #[test]
    fn detects_selections_across_sides() {
        let mut event = ReviewCommentEvent::from_payload(SAMPLE_PAYLOAD, None).unwrap();
        assert!(!event.spans_both_sides());

        event.start_side = Some(Side::Right);
        assert!(!event.spans_both_sides());

        event.start_side = Some(Side::Left);
        assert!(event.spans_both_sides());
    }

    #[tokio::test]
    async fn loads_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, SAMPLE_PAYLOAD).unwrap();

        let event = ReviewCommentEvent::load(&path, None).await.unwrap();
        assert_eq!(event.path, "src/app.py");
    }
}
