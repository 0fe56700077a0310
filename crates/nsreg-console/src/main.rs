//! `nsreg`: terminal console and CLI for namespaced registry instances.
//!
//! Without a subcommand the interactive console starts; with one, a single
//! remote call is made against the given URL and its result printed.

mod app;
mod commands;
mod config;
mod console;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nsreg_client::RegistryClient;
use nsreg_explorer::Route;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::commands::Commands;
use crate::config::ConsoleConfig;

#[derive(Debug, Parser)]
#[command(name = "nsreg")]
#[command(about = "Browse and edit namespaced registry instances")]
#[command(version)]
struct Cli {
    /// Config file (default: <config_dir>/nsreg/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Register an extra instance for this run
    #[arg(long = "instance", value_name = "NAME=URL", value_parser = parse_instance)]
    instances: Vec<(String, String)>,

    /// Route to open at startup, e.g. /instance/<id>/explore/app/flag
    #[arg(long, value_name = "ROUTE")]
    open: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn parse_instance(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
            Ok((name.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(format!("expected NAME=URL, got '{raw}'")),
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Console logs go to a file so the terminal stays clean.
fn setup_file_tracing(path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    tracing::info!(path = %path.display(), "Console tracing initialized");
    Ok(())
}

fn setup_stderr_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = &cli.command {
        setup_stderr_tracing(cli.verbose);
        let registry = RegistryClient::new(command.url())?;
        let mut stdout = std::io::stdout().lock();
        return command.execute(&registry, &mut stdout).await;
    }

    let config = ConsoleConfig::load(cli.config.as_deref())?;
    setup_file_tracing(&config.log_file(), cli.verbose)?;

    let store = config.initial_store(&cli.instances)?;
    tracing::info!(instances = store.len(), "Starting console");
    let mut app = App::new(store, config.instances_file());

    if let Some(raw) = &cli.open {
        let route = Route::parse(raw).with_context(|| format!("invalid --open route '{raw}'"))?;
        app.navigate(route);
    }

    console::run_console(app, Duration::from_millis(config.tick_ms.max(10))).await
}
