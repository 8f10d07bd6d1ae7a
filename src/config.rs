use crate::adapters::llm::ModelConfig;
use crate::core::prompt::DEFAULT_TRIGGER_PATTERN;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The only user allowed to trigger the bot.
    pub authorized_actor: Option<String>,

    #[serde(default = "default_trigger_pattern")]
    pub trigger_pattern: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    pub api_key: Option<String>,
    pub base_url: Option<String>,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    pub github_token: Option<String>,

    #[serde(default = "default_completion_attempts")]
    pub completion_attempts: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_reaction")]
    pub reaction: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authorized_actor: None,
            trigger_pattern: default_trigger_pattern(),
            model: default_model(),
            temperature: 0.0,
            api_key: None,
            base_url: None,
            github_api_url: default_github_api_url(),
            github_token: None,
            completion_attempts: default_completion_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            reaction: default_reaction(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Try to load from .reviewbot.yml in current directory
        for name in [".reviewbot.yml", ".reviewbot.yaml"] {
            let config_path = PathBuf::from(name);
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        // Try in home directory
        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".reviewbot.yml");
            if home_config.exists() {
                return Self::load_from(&home_config);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn merge_with_cli(
        &mut self,
        cli_model: Option<String>,
        cli_actor: Option<String>,
        cli_trigger: Option<String>,
    ) {
        if let Some(model) = cli_model {
            self.model = model;
        }
        if let Some(actor) = cli_actor {
            self.authorized_actor = Some(actor);
        }
        if let Some(trigger) = cli_trigger {
            self.trigger_pattern = trigger;
        }
    }

    /// Fills credentials that were not set in the file from the environment.
    pub fn merge_with_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.github_token.is_none() {
            self.github_token = std::env::var("GITHUB_TOKEN").ok();
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.authorized_actor.as_deref() {
            Some(actor) if !actor.trim().is_empty() => {}
            _ => anyhow::bail!(
                "authorized_actor is not configured. Set it in .reviewbot.yml or pass --authorized-actor"
            ),
        }
        regex::Regex::new(&self.trigger_pattern)
            .with_context(|| format!("Invalid trigger_pattern: {}", self.trigger_pattern))?;
        if self.completion_attempts == 0 {
            anyhow::bail!("completion_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_name: self.model.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_attempts: self.completion_attempts,
            retry_delay_ms: self.retry_delay_ms,
            timeout_secs: self.request_timeout_secs,
        }
    }
}

fn default_trigger_pattern() -> String {
    DEFAULT_TRIGGER_PATTERN.to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-0613".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_completion_attempts() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_reaction() -> String {
    "rocket".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}
