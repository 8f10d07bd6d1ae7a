mod adapters;
mod config;
mod core;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reviewbot")]
#[command(about = "Answers pull request review comments with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Config file (defaults to .reviewbot.yml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    model: Option<String>,

    #[arg(long, global = true, help = "The only user allowed to trigger the bot")]
    authorized_actor: Option<String>,

    #[arg(long, global = true, help = "Regex matching the trigger token at the start of a comment")]
    trigger_pattern: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Handle a review comment event and reply in its thread")]
    Respond {
        #[arg(long, help = "Event payload (defaults to $GITHUB_EVENT_PATH)")]
        event: Option<PathBuf>,

        #[arg(long, help = "Triggering user (defaults to $GITHUB_ACTOR)")]
        actor: Option<String>,
    },
    #[command(about = "Print the prompt an event would produce without posting anything")]
    Prompt {
        #[arg(long, help = "Event payload (defaults to $GITHUB_EVENT_PATH)")]
        event: Option<PathBuf>,

        #[arg(long, help = "Triggering user (defaults to $GITHUB_ACTOR)")]
        actor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration from file and merge with CLI options
    let mut config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };
    config.merge_with_cli(cli.model, cli.authorized_actor, cli.trigger_pattern);
    config.merge_with_env();

    match cli.command {
        Commands::Respond { event, actor } => {
            respond_command(config, event, actor).await?;
        }
        Commands::Prompt { event, actor } => {
            prompt_command(config, event, actor).await?;
        }
    }

    Ok(())
}

async fn respond_command(
    config: config::Config,
    event_path: Option<PathBuf>,
    actor: Option<String>,
) -> Result<()> {
    config.validate()?;
    let event = load_event(event_path, actor).await?;
    info!(
        "Handling comment {} on {}/{}#{}",
        event.comment_id, event.owner, event.repo, event.pull_number
    );

    let github = github_client(&config)?;
    let adapter = adapters::llm::create_adapter(&config.model_config())?;
    let prompts = core::PromptBuilder::new(&config.trigger_pattern)?;

    let orchestrator = core::Orchestrator::new(
        core::OrchestratorConfig {
            // validate() has checked this is present
            authorized_actor: config.authorized_actor.clone().unwrap_or_default(),
            reaction: config.reaction.clone(),
        },
        prompts,
        &github,
        &github,
        &github,
        adapter.as_ref(),
    );

    let outcome = orchestrator.handle(&event).await?;
    match outcome {
        core::Outcome::Failed => warn!("Finished without an answer: {:?}", outcome),
        _ => info!("Finished: {:?}", outcome),
    }

    Ok(())
}

async fn prompt_command(
    config: config::Config,
    event_path: Option<PathBuf>,
    actor: Option<String>,
) -> Result<()> {
    let event = load_event(event_path, actor).await?;
    let github = github_client(&config)?;
    let prompts = core::PromptBuilder::new(&config.trigger_pattern)?;

    let code = core::SelectionResolver::new(&github).resolve(&event).await?;
    let prompt = prompts.build_prompt(
        prompts.strip_trigger(&event.body),
        &code,
        core::prompt::language_tag(&event.path),
    );

    println!("{}", prompt);
    Ok(())
}

async fn load_event(
    path: Option<PathBuf>,
    actor: Option<String>,
) -> Result<core::ReviewCommentEvent> {
    let path = path
        .or_else(|| std::env::var_os("GITHUB_EVENT_PATH").map(PathBuf::from))
        .context("No event payload. Pass --event or set GITHUB_EVENT_PATH")?;
    let actor = actor.or_else(|| std::env::var("GITHUB_ACTOR").ok());
    let event = core::ReviewCommentEvent::load(&path, actor).await?;
    debug!(?event, "Loaded review comment event");
    Ok(event)
}

fn github_client(config: &config::Config) -> Result<adapters::GitHubClient> {
    let token = config
        .github_token
        .clone()
        .context("GitHub token not found. Set GITHUB_TOKEN environment variable or provide in config")?;
    adapters::GitHubClient::new(
        &config.github_api_url,
        token,
        adapters::RunContext::from_env(),
        config.request_timeout_secs,
    )
}
