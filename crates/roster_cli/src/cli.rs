//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use roster_core::{LoadPolicy, Settings};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "roster", version, about = "Student roster over a flat CSV file")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Runs the interactive shell when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Roster data file (default: students.csv).
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Malformed-line handling on load: fail, skip or default.
    #[arg(long, global = true, value_parser = parse_policy)]
    pub on_malformed: Option<LoadPolicy>,

    /// Log level for file logging.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Applies flag overrides on top of file/env settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(file) = &self.file {
            settings.data.file = file.clone();
        }
        if let Some(policy) = self.on_malformed {
            settings.data.on_malformed = policy.as_str().to_string();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            settings.logging.dir = Some(dir.clone());
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints all records with their keys.
    List,
    /// Appends a record and saves.
    Add {
        name: String,
        id: String,
        course: String,
        #[arg(long)]
        grade: Option<String>,
    },
    /// Changes fields of the record at KEY (as printed by `list`) and saves.
    Update {
        key: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        grade: Option<String>,
    },
    /// Removes the record at KEY and saves.
    Delete { key: u64 },
    /// Prints the course catalog.
    Courses,
    /// Interactive session with manual save.
    Shell,
}

fn parse_policy(value: &str) -> Result<LoadPolicy, String> {
    value.parse()
}
