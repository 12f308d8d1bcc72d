//! CLI entry point for chatflow.
//!
//! This binary provides the `chatflow` command with subcommands for
//! authoring rules, simulating a message, and running a stdin listener.

mod cli;
mod config;
mod console_host;
mod listen;

use std::sync::Arc;

use anyhow::{Context, Result};
use chatflow_engine::{CommandHandler, MessageEvent, RuleDispatcher, RuleStorage, example_commands};
use chatflow_store::{Database, SqliteRuleStore};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::{ChatflowConfig, LogFormat, LoggingConfig};
use crate::console_host::ConsoleHost;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (config, source) = ChatflowConfig::load(&cli.config)?;
    init_tracing(&config.logging);
    source.log();

    match cli.command {
        Commands::Workflow { user, yes, args } => {
            cmd_workflow(&App::open(&config).await?, &user, yes, &args).await
        }
        Commands::Simulate { room, user, text } => {
            cmd_simulate(&App::open(&config).await?, &room, &user, &text.join(" ")).await
        }
        Commands::Listen => listen::run(&App::open(&config).await?).await,
        Commands::Examples => {
            cmd_examples();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Application wiring
// ---------------------------------------------------------------------------

/// Everything a subcommand needs, wired from the configuration.
pub struct App {
    pub host: Arc<ConsoleHost>,
    pub handler: CommandHandler,
    pub dispatcher: RuleDispatcher,
}

impl App {
    async fn open(config: &ChatflowConfig) -> Result<Self> {
        let db_path = config.database.path.clone();
        let db = Database::open_and_migrate(db_path.clone())
            .await
            .with_context(|| format!("failed to open database {}", db_path.display()))?;
        info!(path = %db_path.display(), "rule store ready");

        let storage: Arc<dyn RuleStorage> = Arc::new(SqliteRuleStore::new(db));
        let host = Arc::new(ConsoleHost::new(
            config.directory.clone(),
            config.bot.app_user.as_deref(),
        ));

        Ok(Self {
            handler: CommandHandler::new(Arc::clone(&storage)),
            dispatcher: RuleDispatcher::new(storage, host.clone()),
            host,
        })
    }
}

// ---------------------------------------------------------------------------
// Subcommand: workflow
// ---------------------------------------------------------------------------

async fn cmd_workflow(app: &App, user: &str, yes: bool, args: &[String]) -> Result<()> {
    let sender = app.host.resolve_user(user);
    let reply = app
        .handler
        .execute(&sender, args)
        .await
        .context("workflow command failed")?;
    println!("{}", reply.text);

    let Some(steps) = reply.preview else {
        return Ok(());
    };

    let approved = yes || confirm("\nCreate these workflows? [y/N] ").await?;
    let outcome = if approved {
        app.handler.approve(&sender, steps).await?
    } else {
        app.handler.cancel()
    };
    println!("{}", outcome.text);
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

// ---------------------------------------------------------------------------
// Subcommand: simulate
// ---------------------------------------------------------------------------

async fn cmd_simulate(app: &App, room: &str, user: &str, text: &str) -> Result<()> {
    let event = MessageEvent::new(
        "simulated",
        text,
        app.host.resolve_user(user),
        app.host.resolve_room(room),
    );

    let report = app
        .dispatcher
        .on_event(&event)
        .await
        .context("dispatch failed")?;

    if report.ignored_self {
        println!("message from the app user ignored");
        return Ok(());
    }
    println!(
        "{} rule(s) considered, {} matched, {} failed",
        report.considered,
        report.matched.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  {}: {}", failure.rule_id, failure.reason);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: examples
// ---------------------------------------------------------------------------

fn cmd_examples() {
    println!("Example English commands:");
    for example in example_commands() {
        println!("  chatflow workflow english '{example}'");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber from the `[logging]` section.
///
/// Logs go to stderr so they never interleave with chat output.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
