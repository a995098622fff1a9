//! Browserdeck - control panel for a remote browser-automation service
//!
//! Launch agent task runs, watch their progress stream live, stop them
//! cooperatively, and run single or batched page extractions.

use anyhow::Result;
use browserdeck::{
    agent::{AgentConfig, ControlState, RunState, TaskDetails, TaskLauncher, UiDispatcher, UiEvent},
    client::{HttpRemoteClient, RemoteClient},
    config::DeckConfig,
    scrape::{self, BatchQueue, ScrapeConfig},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "browserdeck")]
#[command(version)]
#[command(about = "Control panel for a remote browser-automation service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BROWSERDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an agent task and stream its progress
    Run {
        /// Task description
        task: String,

        /// Starting URL for the agent
        #[arg(short, long)]
        url: Option<String>,

        /// Reasoning model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum number of agent steps (1-100)
        #[arg(long)]
        max_steps: Option<u8>,

        /// Attach the credential vault
        #[arg(long)]
        vault: bool,

        /// Attach the active persona
        #[arg(long)]
        persona: bool,

        /// Attach file storage
        #[arg(long)]
        files: bool,
    },

    /// Scrape a single page
    Scrape {
        /// Target URL
        url: String,

        /// Include hyperlinks in the output
        #[arg(long)]
        links: bool,

        /// Keep navigation and boilerplate
        #[arg(long)]
        full_page: bool,

        /// Natural-language extraction instructions
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Scrape a batch of URLs from a file (one per line, or first CSV column)
    Batch {
        /// File of URLs
        file: PathBuf,

        /// Include hyperlinks in the output
        #[arg(long)]
        links: bool,

        /// Keep navigation and boilerplate
        #[arg(long)]
        full_page: bool,

        /// Natural-language extraction instructions
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("browserdeck={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DeckConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            task,
            url,
            model,
            max_steps,
            vault,
            persona,
            files,
        } => {
            let agent_config = AgentConfig {
                reasoning_model: model.unwrap_or_else(|| config.agent.reasoning_model.clone()),
                max_steps: max_steps.unwrap_or(config.agent.max_steps),
                attach_vault: vault,
                attach_persona: persona,
                attach_files: files,
            };
            run_task(config, agent_config, TaskDetails { task, url }).await?;
        }
        Commands::Scrape {
            url,
            links,
            full_page,
            instructions,
        } => {
            let client = HttpRemoteClient::from_config(&config)?;
            let scrape_config = ScrapeConfig {
                url,
                scrape_links: links,
                only_main_content: !full_page,
                instructions,
            };
            let output = scrape::run_single(&client, &scrape_config).await?;
            println!("{}", output);
        }
        Commands::Batch {
            file,
            links,
            full_page,
            instructions,
        } => {
            let template = ScrapeConfig {
                url: String::new(),
                scrape_links: links,
                only_main_content: !full_page,
                instructions,
            };
            run_batch(config, template, &file).await?;
        }
        Commands::Config { default } => {
            let shown = if default { DeckConfig::default() } else { config };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

async fn run_task(
    config: DeckConfig,
    agent_config: AgentConfig,
    details: TaskDetails,
) -> Result<()> {
    let client: Arc<dyn RemoteClient> = Arc::new(HttpRemoteClient::from_config(&config)?);
    let (ui, mut rx) = UiDispatcher::channel();
    let launcher = TaskLauncher::new(
        Arc::new(RunState::new()),
        client,
        Arc::new(config),
        ui,
    );

    let worker = launcher.launch(agent_config, details)?;
    tracing::info!("Task launched. Press Ctrl+C to stop the agent.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                launcher.request_stop();
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                let done = matches!(event, UiEvent::Controls(ControlState::Idle));
                render(event);
                if done {
                    break;
                }
            }
        }
    }

    worker.await?;
    Ok(())
}

async fn run_batch(config: DeckConfig, template: ScrapeConfig, file: &std::path::Path) -> Result<()> {
    let client = HttpRemoteClient::from_config(&config)?;
    let mut queue = BatchQueue::new();
    let added = queue.import_file(file)?;
    if added == 0 {
        anyhow::bail!("No valid URLs found in {}", file.display());
    }
    tracing::info!(count = added, "Batch queue loaded");

    let (ui, mut rx) = UiDispatcher::channel();
    let total = queue.len();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let UiEvent::BatchItem { index, status } = event {
                eprintln!("[{}/{}] {:?}", index + 1, total, status);
            }
        }
    });

    let output = scrape::run_batch(&client, &template, &mut queue, &ui).await;
    drop(ui);
    printer.await?;
    println!("{}", output);
    Ok(())
}

fn render(event: UiEvent) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match event {
        UiEvent::Thoughts(step) => {
            println!("[{}] goal: {}", now, step.next_goal);
            println!("[{}] page: {}", now, step.page_summary);
        }
        UiEvent::ActionLogged(line) => println!("[{}] > {}", now, line),
        UiEvent::ConsoleLine(line) => println!("[{}] {}", now, line),
        UiEvent::Controls(_) | UiEvent::BatchItem { .. } => {}
        UiEvent::RunFinished(_) => {}
    }
}
