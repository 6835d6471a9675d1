mod cli;
mod commands;
mod report;

use clap::Parser;
use snapdiff::config::{CliOverrides, ResolvedRunConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snapdiff=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Init { force } => {
            commands::init(force)?;
        }
        cli::Command::Compare {
            baseline,
            current,
            ignore,
            output,
            json,
            timeout_ms,
            diff,
        } => {
            let overrides = CliOverrides {
                diff,
                parallel: None,
                timeout_ms,
            };
            let config = ResolvedRunConfig::new(overrides)?;
            let code = commands::compare(config, &baseline, &current, ignore, output, json).await?;
            std::process::exit(code);
        }
        cli::Command::Add {
            id,
            current,
            baseline,
            name,
            ignore,
        } => {
            commands::add(&id, &current, baseline.as_deref(), name.as_deref(), ignore)?;
        }
        cli::Command::Run {
            filter,
            parallel,
            timeout_ms,
            diff,
        } => {
            let overrides = CliOverrides {
                diff,
                parallel,
                timeout_ms,
            };
            let config = ResolvedRunConfig::new(overrides)?;
            let code = commands::run(config, filter.as_deref()).await?;
            std::process::exit(code);
        }
        cli::Command::Approve { id } => commands::approve(&id)?,
        cli::Command::Reject { id } => commands::reject(&id)?,
        cli::Command::Baseline { id } => commands::set_baseline(&id)?,
        cli::Command::Remove { id } => commands::remove(&id)?,
        cli::Command::List => commands::list()?,
    }

    Ok(())
}
