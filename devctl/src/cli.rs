use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devctl")]
#[command(about = "Supervisor for a project's local development servers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true, env = "DEVCTL_PROJECT")]
    pub project: Option<PathBuf>,

    /// Config file to load instead of discovering one in the project
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start adapters and wait until they are ready
    Start(StartArgs),

    /// Stop adapters, force-killing any that do not exit
    Stop(StopArgs),

    /// Stop, then start adapters
    Restart(RestartArgs),

    /// Show whether adapters are running
    Status(StatusArgs),

    /// Show the tail of adapter logs
    Logs(LogsArgs),
}

#[derive(Parser)]
pub struct StartArgs {
    /// Adapter name (all adapters when omitted)
    pub name: Option<String>,
}

#[derive(Parser)]
pub struct StopArgs {
    /// Adapter name (all adapters when omitted)
    pub name: Option<String>,
}

#[derive(Parser)]
pub struct RestartArgs {
    /// Adapter name (all adapters when omitted)
    pub name: Option<String>,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Adapter name (optional)
    pub name: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct LogsArgs {
    /// Adapter name (optional - shows all adapters if not specified)
    pub name: Option<String>,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value = "20")]
    pub lines: usize,

    /// Disable colored output
    #[arg(long)]
    pub no_colors: bool,
}
