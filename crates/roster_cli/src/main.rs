//! `roster` command-line front end.
//!
//! # Responsibility
//! - Resolve settings (defaults, config file, environment, flags).
//! - Start file logging when a log directory is configured.
//! - Load the roster once and hand the service to a one-shot command or to
//!   the interactive shell.

mod cli;
mod commands;
mod render;
mod shell;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use log::{info, warn};
use roster_core::{init_logging, LoadSource, RosterService, Settings};
use std::io;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.global.config.as_deref())?;
    cli.global.apply(&mut settings);

    if let Some(dir) = &settings.logging.dir {
        init_logging(&settings.logging.level, dir)?;
    }

    let repo = settings.repository()?;
    let (mut service, loaded) = RosterService::open(repo)
        .with_context(|| format!("failed to load `{}`", settings.data.file.display()))?;

    if loaded.source == LoadSource::Missing {
        eprintln!(
            "No existing file found at `{}`. A new file will be created on save.",
            settings.data.file.display()
        );
    }
    for issue in &loaded.issues {
        warn!(
            "event=cli_load module=cli status=recovered line={} problem={}",
            issue.line,
            issue.problem.code()
        );
        eprintln!("warning: {issue}");
    }
    info!(
        "event=cli_start module=cli status=ok records={} interactive={}",
        service.store().len(),
        matches!(cli.command, None | Some(Command::Shell))
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        None | Some(Command::Shell) => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            shell::Shell::new(service).run(&mut input, &mut out)
        }
        Some(command) => commands::run_command(command, &mut service, &mut out),
    }
}
