//! wwa - Generate agent workspace documents (USER.md, IDENTITY.md, SOUL.md)
//! from links or a persona description.

mod app_config;
mod workspace;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use wwa_core::application::{CommandService, Orchestrator, Reply};
use wwa_core::domain::RequesterKey;
use wwa_core::port::id_provider::UuidProvider;
use wwa_core::port::time_provider::SystemTimeProvider;
use wwa_infra_llm::{HttpCompletionClient, PROVIDERS};
use wwa_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use wwa_infra_system::{FsInstaller, TokioProcessRunner};

use crate::app_config::{expand, AppConfig};
use crate::workspace::{resolve_workspace, ProcessEnv};

#[derive(Parser)]
#[command(name = "wwa")]
#[command(about = "Profile & persona synthesis for agent workspaces", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.wwa/config.toml if present)
    #[arg(long, global = true, env = "WWA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue links and generate USER.md (`wwa whoami help` for actions)
    Whoami {
        #[command(flatten)]
        requester: RequesterArgs,

        /// Command text: add <link>... | list | clear | run [flags] | help
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Generate IDENTITY.md and SOUL.md (`wwa whoareu help` for flags)
    Whoareu {
        #[command(flatten)]
        requester: RequesterArgs,

        /// Command text: a description, or --template/--reference
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List known model providers for direct-call synthesis
    Providers,

    /// Print the resolved install directory
    Workspace,
}

/// Who is asking; link queues are kept per requester.
#[derive(Args)]
struct RequesterArgs {
    #[arg(long, env = "WWA_CHANNEL", default_value = "cli")]
    channel: String,

    #[arg(long, env = "WWA_ACCOUNT", default_value = "local")]
    account: String,

    #[arg(long, env = "WWA_SENDER", default_value = "me")]
    sender: String,
}

impl RequesterArgs {
    fn key(&self) -> RequesterKey {
        RequesterKey::new(&self.channel, &self.account, &self.sender)
    }
}

/// Logs go to stderr (replies own stdout), optionally also to a daily file.
fn init_logging() -> Option<WorkerGuard> {
    let log_format = std::env::var("WWA_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("wwa=info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>> = Vec::new();
    layers.push(match log_format.as_str() {
        "json" => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        "pretty" => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        _ => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    });

    let guard = match std::env::var("WWA_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(expand(&dir), "wwa.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().json().with_writer(writer).boxed());
            Some(guard)
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
    guard
}

fn workspace_dir(config: &AppConfig) -> Result<PathBuf> {
    if let Some(dir) = config.workspace_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        return Ok(expand(dir));
    }
    let home = directories::BaseDirs::new()
        .context("Unable to determine home directory")?
        .home_dir()
        .to_path_buf();
    Ok(resolve_workspace(&ProcessEnv, &home))
}

/// Wire adapters into the command service (composition root).
async fn build_service(config: &AppConfig) -> Result<CommandService> {
    let workspace = workspace_dir(config)?;
    let settings = config.pipeline_settings(workspace.clone())?;

    let db_path = config.state_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path.display(), workspace = %workspace.display(), "Opening queue store");

    let pool = create_pool(&db_path)
        .await
        .context("Queue database unavailable")?;
    run_migrations(&pool).await.context("Migration failed")?;

    let time_provider = Arc::new(SystemTimeProvider);
    let queue = SqliteQueueStore::new(pool, time_provider.clone());
    match queue.purge_malformed().await {
        Ok(0) => {}
        Ok(purged) => warn!(purged, "Removed malformed queue entries"),
        Err(e) => warn!(error = %e, "Malformed-entry sweep failed"),
    }

    let orchestrator = Orchestrator::new(
        Arc::new(TokioProcessRunner::new(config.limits.max_output_bytes)),
        Arc::new(HttpCompletionClient::new(config.llm_settings())),
        Arc::new(FsInstaller::new(time_provider)),
        Arc::new(UuidProvider),
        settings,
    );

    Ok(CommandService::new(Arc::new(queue), Arc::new(orchestrator)))
}

fn finish(service: &CommandService, reply: &Reply) -> ExitCode {
    println!("{}", service.render(reply));
    if reply.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_providers() {
    let width = PROVIDERS.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for provider in PROVIDERS {
        println!(
            "{:<width$}  {:<50}  {:<20}  {}{}",
            provider.name,
            provider.api_base,
            provider.env_key,
            provider.default_model,
            if provider.is_relay { "  (relay)" } else { "" },
            width = width
        );
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Whoami { requester, args } => {
            let service = build_service(&config).await?;
            let text = shell_words::join(&args);
            let reply = service
                .profile_reply(&requester.key(), &text)
                .await
                .context("Internal error")?;
            Ok(finish(&service, &reply))
        }

        Commands::Whoareu { requester, args } => {
            let service = build_service(&config).await?;
            let text = shell_words::join(&args);
            let reply = service.persona_reply(&requester.key(), &text).await;
            Ok(finish(&service, &reply))
        }

        Commands::Providers => {
            print_providers();
            Ok(ExitCode::SUCCESS)
        }

        Commands::Workspace => {
            println!("{}", workspace_dir(&config)?.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
