use anyhow::{Context, Result};
use regex::Regex;

pub const DEFAULT_TRIGGER_PATTERN: &str = r"^\$ai\s+";

/// Turns a trigger comment and the selected code into the text sent to the model.
pub struct PromptBuilder {
    trigger: Regex,
}

impl PromptBuilder {
    pub fn new(trigger_pattern: &str) -> Result<Self> {
        let trigger = Regex::new(trigger_pattern)
            .with_context(|| format!("Invalid trigger pattern: {}", trigger_pattern))?;
        Ok(Self { trigger })
    }

    pub fn is_triggered(&self, body: &str) -> bool {
        self.trigger.find(body).map_or(false, |m| m.start() == 0)
    }

    /// Removes the leading trigger token, leaving the question itself.
    pub fn strip_trigger<'a>(&self, body: &'a str) -> &'a str {
        match self.trigger.find(body) {
            Some(m) if m.start() == 0 => &body[m.end()..],
            _ => body,
        }
    }

    pub fn build_prompt(&self, body: &str, code: &str, language: &str) -> String {
        format!("{}\n\n```{}\n{}\n```", body.trim(), language, code)
            .trim()
            .to_string()
    }
}

/// The file extension used to tag the code fence. Paths without a `.` are
/// returned whole.
pub fn language_tag(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
