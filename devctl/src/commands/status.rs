use crate::cli::StatusArgs;
use crate::common::{ProjectTarget, RUNNING_ICON, STOPPED_ICON, format_duration, uptime_secs};
use chrono::Utc;
use colored::*;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdapterStatus {
    name: String,
    status: &'static str,
    pid: Option<u32>,
    port: Option<u16>,
    url: Option<String>,
    uptime_secs: Option<u64>,
    last_error: Option<String>,
    log: PathBuf,
}

pub async fn execute(target: &ProjectTarget, args: StatusArgs) -> anyhow::Result<()> {
    let project = target.open().await?;
    let selected = project.select(args.name.as_deref())?;
    let now = Utc::now();

    let mut statuses = Vec::with_capacity(selected.len());
    for adapter in &selected {
        let running = adapter.is_running().await;
        statuses.push(AdapterStatus {
            name: adapter.name().to_string(),
            status: if running { "running" } else { "stopped" },
            pid: if running { adapter.pid() } else { None },
            port: adapter.config().port,
            url: adapter.url(),
            uptime_secs: if running {
                uptime_secs(adapter.started_at(), now)
            } else {
                None
            },
            last_error: adapter.last_error(),
            log: adapter.log_file().to_path_buf(),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for status in &statuses {
        print_status(status);
    }
    Ok(())
}

fn print_status(status: &AdapterStatus) {
    if status.status == "running" {
        print!("{} {} {}", RUNNING_ICON.green(), status.name.bold(), "running".green());
    } else {
        print!("{} {} {}", STOPPED_ICON.dimmed(), status.name.bold(), "stopped".dimmed());
    }
    if let Some(pid) = status.pid {
        print!("  PID {}", pid);
    }
    if let Some(secs) = status.uptime_secs {
        print!("  up {}", format_duration(secs));
    }
    println!();

    if let Some(url) = &status.url {
        println!("    URL:   {}", url);
    }
    if let Some(port) = status.port {
        println!("    Port:  {}", port);
    }
    println!("    Log:   {}", status.log.display());
    if let Some(error) = &status.last_error {
        println!("    Error: {}", error.red());
    }
}
