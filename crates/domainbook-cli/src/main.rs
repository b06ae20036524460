mod commands;
mod error;
mod server;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::commands::{backup, completions, directory, export, serve, Context};
use crate::error::{exit_code_for, report_error};
use domainbook_config as config;
use domainbook_store::{paths, Store};

#[derive(Debug, Parser)]
#[command(name = "domainbook", version, about = "domainbook CLI")]
struct Cli {
    #[arg(long, global = true)]
    table_path: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every domain in the directory
    Domains(directory::DomainsArgs),
    /// List the emails stored under a domain
    Emails(directory::EmailsArgs),
    /// Add an email under a domain
    Add(directory::AddArgs),
    /// Delete an email
    Delete(directory::DeleteArgs),
    /// Export the directory as a domain-grouped CSV report
    Export(export::ExportArgs),
    /// Snapshot the directory table
    Backup(backup::BackupArgs),
    /// Serve the HTTP API
    Serve(serve::ServeArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let serving = matches!(cli.command, Command::Serve(_));
    init_logging(verbose, serving);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        table_path,
        config: config_path,
        json,
        verbose,
        command,
    } = cli;

    if let Command::Completions(args) = command {
        return completions::emit(args);
    }

    let app_config = config::load(config_path.clone()).with_context(|| "load config")?;
    if verbose {
        match config::resolve_config_path(config_path) {
            Ok(path) => {
                if path.exists() {
                    debug!(path = %path.display(), "config resolved");
                } else {
                    debug!(path = %path.display(), "config missing, using defaults");
                }
            }
            Err(err) => {
                debug!(error = %err, "config unavailable");
            }
        }
    }

    let table_path = paths::resolve_table_path(table_path.or(app_config.table_path.clone()))
        .with_context(|| "resolve table path")?;
    debug!(path = %table_path.display(), "table path resolved");

    let store = Store::open(&table_path)
        .with_context(|| format!("open table {}", table_path.display()))?;

    let ctx = Context {
        store: &store,
        json,
        config: &app_config,
    };

    match command {
        Command::Domains(args) => directory::list_domains(&ctx, args),
        Command::Emails(args) => directory::list_emails(&ctx, args),
        Command::Add(args) => directory::add_email(&ctx, args),
        Command::Delete(args) => directory::delete_email(&ctx, args),
        Command::Export(args) => export::export(&ctx, args),
        Command::Backup(args) => backup::backup(&ctx, args),
        Command::Serve(args) => serve::serve(&ctx, args),
        Command::Completions(_) => {
            unreachable!("completions command handled before store initialization")
        }
    }
}

fn init_logging(verbose: bool, serving: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default_level = match (verbose, serving) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
