use crate::cli::StartArgs;
use crate::common::{FAILURE_ICON, ProjectTarget, SUCCESS_ICON};
use colored::*;
use devctl_supervisor::Project;

pub async fn execute(target: &ProjectTarget, args: StartArgs) -> anyhow::Result<()> {
    let project = target.open().await?;
    start_adapters(&project, args.name.as_deref()).await
}

/// Starts the selected adapters concurrently and reports each outcome.
pub async fn start_adapters(project: &Project, name: Option<&str>) -> anyhow::Result<()> {
    let selected = project.select(name)?;
    println!("━━━ Starting {} adapter(s) ━━━", selected.len());
    println!();

    let outcomes = tokio::select! {
        outcomes = project.start(name) => outcomes?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            anyhow::bail!("Interrupted; launched processes were left running");
        }
    };

    let mut failed = 0;
    for outcome in &outcomes {
        let Some(adapter) = project.adapter(&outcome.name) else {
            continue;
        };

        match &outcome.result {
            Ok(()) => {
                print!("  {} {}", SUCCESS_ICON.green(), outcome.name.bold());
                if let Some(pid) = adapter.pid() {
                    print!("  PID {}", pid);
                }
                if let Some(url) = adapter.url() {
                    print!("  {}", url.cyan());
                }
                println!();
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}  {}", FAILURE_ICON.red(), outcome.name.bold(), e);
                println!("    Log: {}", adapter.log_file().display());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} adapter(s) failed to start", failed, outcomes.len());
    }
    Ok(())
}
