//! sqlgate CLI - manage gateway config sources: migrate, export, compare,
//! and check status between YAML directories and the metadata database.

mod commands;
mod output;
mod source;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::migrate::{self, MigrateCommands};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "sqlgate",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "sqlgate - configuration-driven API gateway",
    long_about = "CLI tool for migrating, exporting, and comparing sqlgate config sources.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migration operations between config sources
    #[command(subcommand)]
    Migrate(MigrateCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = match cli.command {
        Commands::Migrate(cmd) => migrate::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
