pub mod error;
pub mod event;
pub mod orchestrator;
pub mod prompt;
pub mod reply;
pub mod selection;

pub use event::ReviewCommentEvent;
pub use orchestrator::{Orchestrator, OrchestratorConfig, Outcome};
pub use prompt::PromptBuilder;
pub use selection::SelectionResolver;
