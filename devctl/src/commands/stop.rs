use crate::cli::StopArgs;
use crate::common::{ProjectTarget, SUCCESS_ICON};
use colored::*;
use devctl_supervisor::Project;

pub async fn execute(target: &ProjectTarget, args: StopArgs) -> anyhow::Result<()> {
    let project = target.open().await?;
    stop_adapters(&project, args.name.as_deref()).await
}

pub async fn stop_adapters(project: &Project, name: Option<&str>) -> anyhow::Result<()> {
    let selected = project.select(name)?;
    project.stop(name).await?;

    for adapter in &selected {
        println!("{} Stopped {}", SUCCESS_ICON.green(), adapter.name());
    }
    Ok(())
}
