pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "herald",
    about = "Herald operator CLI",
    long_about = "Operate Herald readiness checks, config inspection, and slash-command catalog sync.",
    after_help = "Examples:\n  herald doctor --json\n  herald config\n  herald sync-commands --scope global --dry-run"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Replace the platform's slash-command catalog with the registry contents")]
    SyncCommands {
        #[arg(long, default_value = "global", help = "`global` or a numeric guild id")]
        scope: String,
        #[arg(long, help = "Print the catalog payload without calling the platform")]
        dry_run: bool,
    },
    #[command(about = "Validate config, verification key, and command registry readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::SyncCommands { scope, dry_run } => commands::sync::run(&scope, dry_run),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
