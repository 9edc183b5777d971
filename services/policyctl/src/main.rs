use anyhow::Result;
use clap::Parser;
use policyctl::cli::Cli;
use policyctl::config::PolicyCtlConfig;
use policyctl::{commands, observability};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = PolicyCtlConfig::from_env_or_yaml()?.with_flags(cli.policy, cli.model);
    observability::init_observability(&config.log_filter);

    let mut stdout = std::io::stdout().lock();
    let status = commands::run(&cli.command, &config, &mut stdout).await?;
    Ok(status.into())
}
