use crate::adapters::llm::{LLMAdapter, LLMRequest};
use crate::adapters::platform::{ContentFetcher, DiagnosticsLinkProvider, ReviewThread};
use crate::core::event::{ReviewCommentEvent, SubjectType};
use crate::core::prompt::{language_tag, PromptBuilder};
use crate::core::reply;
use crate::core::selection::SelectionResolver;
use anyhow::Result;
use tracing::{info, warn};

/// How an invocation ended. Every variant except `Ignored` posted exactly one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The comment did not start with the trigger token.
    Ignored,
    Unauthorized,
    UnsupportedCommentType,
    /// Selection or completion failed; a diagnostic reply was posted.
    Failed,
    Replied,
}

pub struct OrchestratorConfig {
    pub authorized_actor: String,
    pub reaction: String,
}

/// Drives one review-comment event from trigger to threaded reply.
pub struct Orchestrator<'a> {
    config: OrchestratorConfig,
    prompts: PromptBuilder,
    fetcher: &'a dyn ContentFetcher,
    thread: &'a dyn ReviewThread,
    links: &'a dyn DiagnosticsLinkProvider,
    adapter: &'a dyn LLMAdapter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: OrchestratorConfig,
        prompts: PromptBuilder,
        fetcher: &'a dyn ContentFetcher,
        thread: &'a dyn ReviewThread,
        links: &'a dyn DiagnosticsLinkProvider,
        adapter: &'a dyn LLMAdapter,
    ) -> Self {
        Self {
            config,
            prompts,
            fetcher,
            thread,
            links,
            adapter,
        }
    }

    pub async fn handle(&self, event: &ReviewCommentEvent) -> Result<Outcome> {
        if !self.prompts.is_triggered(&event.body) {
            info!(comment_id = event.comment_id, "Comment has no trigger token, ignoring");
            return Ok(Outcome::Ignored);
        }

        if event.actor != self.config.authorized_actor {
            info!(actor = %event.actor, "Rejecting unauthorized actor");
            self.thread
                .create_reply(event, &reply::unauthorized(&self.config.authorized_actor))
                .await?;
            return Ok(Outcome::Unauthorized);
        }

        if event.subject_type == SubjectType::File {
            info!(subject_type = event.subject_type.as_str(), "Rejecting file comment");
            self.thread
                .create_reply(event, reply::UNSUPPORTED_COMMENT_TYPE)
                .await?;
            return Ok(Outcome::UnsupportedCommentType);
        }

        if let Err(err) = self.thread.create_reaction(event, &self.config.reaction).await {
            warn!("Failed to react to comment {}: {:#}", event.comment_id, err);
        }

        let code = match SelectionResolver::new(self.fetcher).resolve(event).await {
            Ok(code) => code,
            Err(err) => return self.report_failure(event, err).await,
        };

        let body = self.prompts.strip_trigger(&event.body);
        let prompt = self
            .prompts
            .build_prompt(body, &code, language_tag(&event.path));
        info!(
            path = %event.path,
            model = self.adapter.model_name(),
            "Requesting completion"
        );

        let request = LLMRequest { user_prompt: prompt.clone() };
        let answer = match self.adapter.complete(request).await {
            Ok(response) => {
                info!(model = %response.model, "Completion received");
                response.content
            }
            Err(err) => return self.report_failure(event, err).await,
        };

        let job_link = self.job_link(event).await;
        self.thread
            .create_reply(event, &reply::answer(&event.actor, &answer, &job_link, &prompt))
            .await?;
        info!(comment_id = event.comment_id, "Posted reply");

        Ok(Outcome::Replied)
    }

    async fn report_failure(
        &self,
        event: &ReviewCommentEvent,
        err: anyhow::Error,
    ) -> Result<Outcome> {
        warn!("Failed to answer comment {}: {:#}", event.comment_id, err);
        let job_link = self.job_link(event).await;
        self.thread
            .create_reply(event, &reply::failure(&err, &job_link))
            .await?;
        Ok(Outcome::Failed)
    }

    async fn job_link(&self, event: &ReviewCommentEvent) -> String {
        match self.links.job_link(event).await {
            Ok(link) => link,
            Err(err) => {
                warn!("Could not resolve job link: {:#}", err);
                "unavailable".to_string()
            }
        }
    }
}
