//! Migration commands: copy, export, compare, and report on config sources.

use anyhow::Result;
use clap::Subcommand;
use gateway_core::migration::MigrationService;

use crate::output::{self, OutputFormat};
use crate::source::{FromArgs, SourceArgs, ToArgs};

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Copy databases/queries/endpoints from one source into another
    Run {
        #[command(flatten)]
        from: FromArgs,
        #[command(flatten)]
        to: ToArgs,
    },

    /// Dump a source's config as YAML
    Export {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Diff two sources by entry name
    Compare {
        #[command(flatten)]
        from: FromArgs,
        #[command(flatten)]
        to: ToArgs,
    },

    /// Summarize entry counts for a source
    Status {
        #[command(flatten)]
        source: SourceArgs,
    },
}

pub async fn execute(cmd: MigrateCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        MigrateCommands::Run { from, to } => {
            let src = from.build_source().await?;
            let dst = to.build_sink().await?;
            let report = MigrationService::migrate(src.as_ref(), dst.as_ref()).await?;
            output::print_item(&report, format);
        }
        MigrateCommands::Export { source } => {
            let src = source.build_source().await?;
            let exported = MigrationService::export(src.as_ref()).await?;
            match format {
                OutputFormat::Table => {
                    output::print_header("databases");
                    println!("{}", exported.databases);
                    output::print_header("queries");
                    println!("{}", exported.queries);
                    output::print_header("endpoints");
                    println!("{}", exported.endpoints);
                }
                _ => output::print_item(&exported, format),
            }
        }
        MigrateCommands::Compare { from, to } => {
            let a = from.build_source().await?;
            let b = to.build_source().await?;
            let report = MigrationService::compare(a.as_ref(), b.as_ref()).await?;
            output::print_item(&report, format);
        }
        MigrateCommands::Status { source } => {
            let src = source.build_source().await?;
            let label = source.label();
            let report =
                MigrationService::status(&[(label.as_str(), src.as_ref())], &label).await?;
            output::print_item(&report, format);
        }
    }
    Ok(())
}
