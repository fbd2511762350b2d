use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tl_cli::commands::report::ReportScope;
use tl_cli::commands::{clear, export, pause, report, run, status, summary, sweep};
use tl_cli::{Cli, Commands, Config};
use tl_core::retention::local_day;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tl_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tl_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries the host protocol in `tl run`, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout();

    match &cli.command {
        Some(Commands::Run) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            run::run(db, &config)?;
        }
        Some(Commands::Summary { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            summary::run(&mut stdout, &db, &config.category_table(), *json)?;
        }
        Some(Commands::Report {
            json,
            filter,
            today,
            day,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let scope = match (*today, *day) {
                (true, _) => ReportScope::Day(local_day(Utc::now())),
                (false, Some(day)) => ReportScope::Day(day),
                (false, None) => ReportScope::Lifetime,
            };
            report::run(
                &mut stdout,
                &db,
                &config.category_table(),
                scope,
                *filter,
                *json,
            )?;
        }
        Some(Commands::Export { output }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let path = export::run(&db, &config.category_table(), output.as_deref())?;
            writeln!(stdout, "Exported report to {}", path.display())?;
        }
        Some(Commands::Clear { yes }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let mut stdin = std::io::stdin().lock();
            clear::run(&mut stdin, &mut stdout, &mut db, *yes)?;
        }
        Some(Commands::Pause) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            pause::run(&mut stdout, &mut db, true)?;
        }
        Some(Commands::Resume) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            pause::run(&mut stdout, &mut db, false)?;
        }
        Some(Commands::Sweep) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let now = Local::now().naive_local();
            sweep::run(&mut stdout, &mut db, config.tracker.retention_days, now)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config)?;
        }
        None => {
            // No subcommand, show help
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
