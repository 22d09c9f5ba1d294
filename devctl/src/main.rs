mod cli;
mod commands;
mod common;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    let target = common::ProjectTarget {
        project: cli.project,
        config: cli.config,
    };

    match cli.command {
        cli::Command::Start(args) => commands::start::execute(&target, args).await,
        cli::Command::Stop(args) => commands::stop::execute(&target, args).await,
        cli::Command::Restart(args) => commands::restart::execute(&target, args).await,
        cli::Command::Status(args) => commands::status::execute(&target, args).await,
        cli::Command::Logs(args) => commands::logs::execute(&target, args).await,
    }
}
