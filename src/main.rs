//! atelier: command-line entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI
//!   3. Install logging at `info`
//!   4. Load config (`--config` > `$ATELIER_CONFIG` > `config/default.toml`)
//!   5. Apply the configured level (`--log-level` > `ATELIER_LOG_LEVEL` > config)
//!   6. Run the subcommand; long-running ones stop on Ctrl-C

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use atelier::agents::{self, AgentKind, trigger};
use atelier::api::ApiServer;
use atelier::config::{self, Config, EnvOverrides};
use atelier::error::AppError;
use atelier::identity::Identity;
use atelier::llm::{LlmProvider, providers};
use atelier::logger;
use atelier::publishing::{Publisher, VocabGenerator};
use atelier::relay::{HttpRelay, LocalRelay, Relay};
use atelier::runtime::{Component, spawn_components};

#[derive(Debug, Parser)]
#[command(name = "atelier", version, about = "Commission and vocabulary-post agents")]
struct Cli {
    /// Config file to load instead of `config/default.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive; overrides config and env.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one agent on its own port until Ctrl-C.
    Agent {
        #[arg(value_enum)]
        kind: AgentKind,
    },
    /// Send the configured commission request to the creator and exit.
    Trigger,
    /// Serve the vocabulary generation HTTP API.
    Api,
    /// Generate, render and (optionally) post one vocabulary image.
    Publish {
        word: String,
        /// Post the image to the configured Telegram chat.
        #[arg(long)]
        telegram: bool,
    },
    /// Print the address an agent's seed resolves to.
    Address {
        #[arg(value_enum)]
        kind: AgentKind,
    },
    /// Run creator, client and vocab in one process over the in-process relay.
    RunAll,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let log = logger::bootstrap()?;

    let config = match &cli.config {
        Some(path) => config::load_from(path, &EnvOverrides::from_env())?,
        None => config::load()?,
    };

    let level = cli.log_level.as_deref().unwrap_or(config.log_level.as_str());
    log.apply(level, cli.log_level.is_some())?;

    info!(
        name = %config.name,
        work_dir = %config.work_dir.display(),
        log_level = %level,
        llm = %config.llm.provider,
        "config loaded"
    );

    match cli.command {
        Command::Agent { kind } => {
            let llm = build_llm(&config)?;
            let relay = Relay::Http(HttpRelay::from_config(&config)?);
            let components = agents::assemble(kind, &config, &llm, &relay)?;
            run_until_shutdown(components).await
        }
        Command::Trigger => {
            let relay = Relay::Http(HttpRelay::from_config(&config)?);
            trigger::run(&config, &relay).await
        }
        Command::Api => {
            let llm = build_llm(&config)?;
            let generator = VocabGenerator::new(llm, &config.prompts_dir);
            let server: Box<dyn Component> = Box::new(ApiServer::new(&config.api.bind, generator));
            run_until_shutdown(vec![server]).await
        }
        Command::Publish { word, telegram } => publish(&config, &word, telegram).await,
        Command::Address { kind } => {
            let identity = Identity::from_seed(&kind.endpoint_config(&config).seed)?;
            println!("{}", identity.address());
            Ok(())
        }
        Command::RunAll => {
            let llm = build_llm(&config)?;
            let relay = Relay::Local(LocalRelay::new());
            let mut components = Vec::new();
            for kind in [AgentKind::Creator, AgentKind::Client, AgentKind::Vocab] {
                components.extend(agents::assemble(kind, &config, &llm, &relay)?);
            }
            run_until_shutdown(components).await
        }
    }
}

fn build_llm(config: &Config) -> Result<LlmProvider, AppError> {
    if config.llm.provider != "dummy" && config.llm_api_key.is_none() {
        warn!(provider = %config.llm.provider, "no LLM API key set (LLM_API_KEY / ASI_API_KEY)");
    }
    providers::build(&config.llm, config.llm_api_key.clone()).map_err(|e| AppError::Config(e.to_string()))
}

async fn publish(config: &Config, word: &str, to_telegram: bool) -> Result<(), AppError> {
    let publisher = Publisher::from_config(config, build_llm(config)?)?;
    if to_telegram && !config.telegram_ready() {
        warn!("--telegram given but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID is missing");
    }
    let published = publisher
        .publish(word, to_telegram)
        .await
        .ok_or_else(|| AppError::Agent(format!("failed to generate vocabulary data for '{word}'")))?;

    let json = serde_json::to_string_pretty(&published.post)
        .map_err(|e| AppError::Agent(format!("cannot encode result: {e}")))?;
    println!("{json}");
    match &published.image {
        Some(image) => println!("image: {}", image.as_string()),
        None => println!("image: (none)"),
    }
    if to_telegram {
        println!("telegram: {}", if published.posted { "posted" } else { "failed" });
    }
    Ok(())
}

/// Spawn `components` and wait for them; Ctrl-C cancels the shared token.
async fn run_until_shutdown(components: Vec<Box<dyn Component>>) -> Result<(), AppError> {
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    spawn_components(components, shutdown).join().await
}
