use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

use tandem_cli::{
    cli::{Cli, Commands},
    commands, logging,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.level());
    debug!(vault = %cli.vault.display(), "Starting tandem");

    let config = cli.config.as_deref();
    let clean = match cli.command {
        Commands::Watch {
            debounce_ms,
            reconcile_first,
        } => {
            commands::watch::execute(
                &cli.vault,
                config,
                Duration::from_millis(debounce_ms),
                reconcile_first,
            )
            .await?;
            true
        }
        Commands::Check => !commands::check::execute(&cli.vault, config, cli.format).await?,
        Commands::Reconcile => {
            !commands::reconcile::execute(&cli.vault, config, cli.format).await?
        }
    };

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
