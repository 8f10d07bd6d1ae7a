use crate::core::error::BotError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-3.5-turbo-0613".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_attempts: 3,
            retry_delay_ms: 1000,
            timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub user_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse>;
    fn model_name(&self) -> &str;
}

pub fn create_adapter(config: &ModelConfig) -> Result<Box<dyn LLMAdapter>> {
    Ok(Box::new(crate::adapters::OpenAIAdapter::new(config.clone())?))
}

/// Fixed-delay retry budget for completion calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

/// What one completion attempt produced: the answer, or the raw response
/// kept for diagnostics when it carried no usable choice.
pub enum AttemptOutcome {
    Answer(String),
    Empty(String),
}

/// Runs `attempt` until it yields an answer or the budget is spent. Transport
/// errors count as failed attempts, the same as empty responses.
pub async fn retry_completion<F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<String>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<AttemptOutcome>>,
{
    let mut last_response = String::from("no attempt made");

    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            Ok(AttemptOutcome::Answer(content)) => return Ok(content.trim().to_string()),
            Ok(AttemptOutcome::Empty(raw)) => {
                warn!(attempt = n, max = policy.max_attempts, "Completion returned no choices");
                last_response = raw;
            }
            Err(err) => {
                warn!(
                    attempt = n,
                    max = policy.max_attempts,
                    error = %err,
                    "Completion request failed"
                );
                last_response = format!("{:#}", err);
            }
        }

        if n < policy.max_attempts {
            sleep(policy.delay).await;
        }
    }

    Err(BotError::CompletionFailed {
        attempts: policy.max_attempts,
        last_response,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }

    fn scripted(outcomes: Vec<Result<AttemptOutcome>>) -> Mutex<VecDeque<Result<AttemptOutcome>>> {
        Mutex::new(outcomes.into_iter().collect())
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_empty_responses() {
        let script = scripted(vec![
            Ok(AttemptOutcome::Empty(r#"{"choices":[]}"#.to_string())),
            Ok(AttemptOutcome::Empty(r#"{"choices":[]}"#.to_string())),
            Ok(AttemptOutcome::Answer(" add a comment ".to_string())),
        ]);
        let calls = Mutex::new(0usize);
        let started = Instant::now();

        let answer = retry_completion(policy(), |_| {
            *calls.lock().unwrap() += 1;
            let next = script.lock().unwrap().pop_front().unwrap();
            async move { next }
        })
        .await
        .unwrap();

        assert_eq!(answer, "add a comment");
        assert_eq!(*calls.lock().unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_empty_responses() {
        let calls = Mutex::new(0usize);

        let err = retry_completion(policy(), |n| {
            *calls.lock().unwrap() += 1;
            async move {
                let raw = format!(r#"{{"choices":[],"n":{}}}"#, n);
                Ok::<_, anyhow::Error>(AttemptOutcome::Empty(raw))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 3);
        match err.downcast_ref::<BotError>() {
            Some(BotError::CompletionFailed {
                attempts,
                last_response,
            }) => {
                assert_eq!(*attempts, 3);
                assert!(last_response.contains(r#""n":3"#));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let script = scripted(vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(AttemptOutcome::Answer("fine".to_string())),
        ]);

        let answer = retry_completion(policy(), |_| {
            let next = script.lock().unwrap().pop_front().unwrap();
            async move { next }
        })
        .await
        .unwrap();

        assert_eq!(answer, "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_after_final_attempt() {
        let started = Instant::now();

        let result = retry_completion(policy(), |_| async {
            Err::<AttemptOutcome, _>(anyhow::anyhow!("timed out"))
        })
        .await;

        assert!(result.is_err());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }
}
