use crate::adapters::llm::{
    retry_completion, AttemptOutcome, LLMAdapter, LLMRequest, LLMResponse, ModelConfig,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OpenAIAdapter {
    client: Client,
    config: ModelConfig,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let api_key = config.api_key.clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .context("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide in config")?;

        let base_url = config.base_url.clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
            base_url,
        })
    }

    async fn attempt(&self, body: &OpenAIRequest<'_>) -> Result<AttemptOutcome> {
        let response = self.client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        let status = response.status();
        let text = response.text().await.context("Failed to read OpenAI response")?;
        let raw: serde_json::Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(_) => anyhow::bail!("OpenAI API error ({}): {}", status, text),
        };
        debug!(%status, "OpenAI response received");

        Ok(match first_choice(&raw) {
            Some(content) => AttemptOutcome::Answer(content),
            None => AttemptOutcome::Empty(raw.to_string()),
        })
    }
}

/// Content of the first choice, if the response carries a non-blank one.
fn first_choice(raw: &serde_json::Value) -> Option<String> {
    let parsed: OpenAIResponse = serde_json::from_value(raw.clone()).ok()?;
    parsed
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|c| !c.trim().is_empty())
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let body = OpenAIRequest {
            model: &self.config.model_name,
            messages: vec![Message {
                role: "user",
                content: &request.user_prompt,
            }],
            temperature: self.config.temperature,
        };

        let content = retry_completion(self.config.retry_policy(), |_| self.attempt(&body)).await?;

        Ok(LLMResponse {
            content,
            model: self.config.model_name.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BotError;
    use mockito::Matcher;
    use serde_json::json;

    fn adapter(base_url: String) -> OpenAIAdapter {
        OpenAIAdapter::new(ModelConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some(base_url),
            retry_delay_ms: 0,
            ..ModelConfig::default()
        })
        .unwrap()
    }

    fn request(prompt: &str) -> LLMRequest {
        LLMRequest { user_prompt: prompt.to_string() }
    }

    #[tokio::test]
    async fn sends_single_user_message_and_trims_answer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "gpt-3.5-turbo-0613",
                "messages": [{ "role": "user", "content": "explain\n\n```py\nx = 1\n```" }],
                "temperature": 0.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":" add a comment "}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let response = adapter(server.url())
            .complete(request("explain\n\n```py\nx = 1\n```"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "add a comment");
        assert_eq!(response.model, "gpt-3.5-turbo-0613");
    }

    #[tokio::test]
    async fn sends_configured_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({ "temperature": 0.5 })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new(ModelConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some(server.url()),
            temperature: 0.5,
            retry_delay_ms: 0,
            ..ModelConfig::default()
        })
        .unwrap();
        adapter.complete(request("hi")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stops_after_three_empty_responses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .expect(3)
            .create_async()
            .await;

        let err = adapter(server.url())
            .complete(request("hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err.downcast_ref::<BotError>() {
            Some(BotError::CompletionFailed {
                attempts,
                last_response,
            }) => {
                assert_eq!(*attempts, 3);
                assert_eq!(last_response, r#"{"choices":[]}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_like_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(502)
            .with_body("Bad Gateway")
            .expect(3)
            .create_async()
            .await;

        let err = adapter(server.url())
            .complete(request("hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        let message = format!("{}", err);
        assert!(message.contains("after 3 attempt(s)"));
        assert!(message.contains("Bad Gateway"));
    }

    #[test]
    fn blank_or_missing_content_is_not_an_answer() {
        assert_eq!(first_choice(&json!({ "choices": [] })), None);
        assert_eq!(first_choice(&json!({ "error": { "message": "quota" } })), None);
        assert_eq!(first_choice(&json!({ "choices": [{ "message": { "content": "  " } }] })), None);
        assert_eq!(first_choice(&json!({ "choices": [{ "message": {} }] })), None);
        assert_eq!(
            first_choice(&json!({
                "choices": [
                    { "message": { "content": "ok" } },
                    { "message": { "content": "no" } }
                ]
            })),
            Some("ok".to_string())
        );
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = ModelConfig {
            api_key: None,
            ..ModelConfig::default()
        };
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(OpenAIAdapter::new(config).is_err());
        }
    }
}
