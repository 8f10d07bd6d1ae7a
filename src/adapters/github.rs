use crate::adapters::platform::{ContentFetcher, DiagnosticsLinkProvider, ReviewThread};
use crate::core::error::BotError;
use crate::core::ReviewCommentEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const GITHUB_JSON: &str = "application/vnd.github+json";
const GITHUB_RAW: &str = "application/vnd.github.raw";

/// Coordinates of the Actions run handling the event, used for diagnostics links.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub run_id: Option<u64>,
    pub job: Option<String>,
    pub server_url: String,
    pub repository: Option<String>,
}

impl RunContext {
    pub fn from_env() -> Self {
        Self {
            run_id: std::env::var("GITHUB_RUN_ID")
                .ok()
                .and_then(|id| id.parse().ok()),
            job: std::env::var("GITHUB_JOB").ok(),
            server_url: std::env::var("GITHUB_SERVER_URL")
                .unwrap_or_else(|_| "https://github.com".to_string()),
            repository: std::env::var("GITHUB_REPOSITORY").ok(),
        }
    }

    /// Link to the run as a whole, when enough context is known.
    pub fn run_url(&self, event: &ReviewCommentEvent) -> Option<String> {
        let run_id = self.run_id?;
        let repository = self
            .repository
            .clone()
            .unwrap_or_else(|| format!("{}/{}", event.owner, event.repo));
        Some(format!(
            "{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            repository,
            run_id
        ))
    }
}

#[derive(Deserialize)]
struct ContentResponse {
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct Job {
    name: String,
    html_url: Option<String>,
}

/// GitHub REST client covering the handful of endpoints the bot touches.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
    run: RunContext,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: String, run: RunContext, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            run,
        })
    }

    /// Builds `{base_url}/{segments...}`, percent-encoding each segment.
    fn api_url<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid GitHub API URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Not a base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        self.send(method, url, GITHUB_JSON, body).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        accept: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        debug!(%method, %url, "GitHub API request");

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token)
            .header("Accept", accept)
            .header("User-Agent", "reviewbot");
        if let Some(body) = body {
            request = request.json(&body);
        }

        request
            .send()
            .await
            .with_context(|| format!("GitHub API {} {} failed", method, url.path()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(BotError::GitHub { status, body }.into())
    }

    async fn find_job_url(
        &self,
        event: &ReviewCommentEvent,
        run_id: u64,
    ) -> Result<Option<String>> {
        let run_id = run_id.to_string();
        let url = self.api_url([
            "repos",
            event.owner.as_str(),
            event.repo.as_str(),
            "actions",
            "runs",
            run_id.as_str(),
            "jobs",
        ])?;
        let response = self.request(Method::GET, url, None).await?;
        let jobs: JobsResponse = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse jobs response")?;

        let wanted = self.run.job.as_deref();
        Ok(jobs
            .jobs
            .into_iter()
            .find(|job| Some(job.name.as_str()) == wanted)
            .and_then(|job| job.html_url))
    }
}

#[async_trait]
impl ContentFetcher for GitHubClient {
    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String> {
        let mut url = self.api_url(
            ["repos", owner, repo, "contents"]
                .into_iter()
                .chain(path.split('/')),
        )?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        let response = self.request(Method::GET, url.clone(), None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BotError::ContentNotFound {
                path: path.to_string(),
                git_ref: git_ref.to_string(),
            }
            .into());
        }

        let payload: ContentResponse = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse content response")?;

        match payload.encoding.as_deref() {
            Some("base64") => decode_base64(&payload.content.unwrap_or_default()),
            // Files over 1 MB come back with `encoding: none` and no content.
            encoding => {
                debug!(?encoding, path, "Content not inlined, fetching raw file");
                let response = self.send(Method::GET, url, GITHUB_RAW, None).await?;
                Self::check(response)
                    .await?
                    .text()
                    .await
                    .context("Failed to read raw file content")
            }
        }
    }
}

#[async_trait]
impl ReviewThread for GitHubClient {
    async fn create_reaction(&self, event: &ReviewCommentEvent, content: &str) -> Result<()> {
        let comment_id = event.comment_id.to_string();
        let url = self.api_url([
            "repos",
            event.owner.as_str(),
            event.repo.as_str(),
            "pulls",
            "comments",
            comment_id.as_str(),
            "reactions",
        ])?;
        let response = self
            .request(Method::POST, url, Some(json!({ "content": content })))
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_reply(&self, event: &ReviewCommentEvent, body: &str) -> Result<()> {
        let pull_number = event.pull_number.to_string();
        let url = self.api_url([
            "repos",
            event.owner.as_str(),
            event.repo.as_str(),
            "pulls",
            pull_number.as_str(),
            "comments",
        ])?;
        let response = self
            .request(
                Method::POST,
                url,
                Some(json!({ "body": body, "in_reply_to": event.comment_id })),
            )
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DiagnosticsLinkProvider for GitHubClient {
    async fn job_link(&self, event: &ReviewCommentEvent) -> Result<String> {
        let run_id = self
            .run
            .run_id
            .context("GITHUB_RUN_ID is not set; no job to link")?;

        match self.find_job_url(event, run_id).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => debug!(job = ?self.run.job, "Current job not listed, linking the run"),
            Err(err) => warn!("Failed to list jobs for run {}: {:#}", run_id, err),
        }
        self.run
            .run_url(event)
            .context("No job link found for this run")
    }
}

/// GitHub wraps base64 content at 60 columns; strip whitespace before decoding.
fn decode_base64(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .context("Failed to decode base64 file content")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
