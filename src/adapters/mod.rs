pub mod github;
pub mod llm;
pub mod openai;
pub mod platform;

pub use github::{GitHubClient, RunContext};
pub use openai::OpenAIAdapter;
