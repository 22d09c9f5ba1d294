use crate::cli::RestartArgs;
use crate::commands::{start, stop};
use crate::common::ProjectTarget;

pub async fn execute(target: &ProjectTarget, args: RestartArgs) -> anyhow::Result<()> {
    let project = target.open().await?;
    let name = args.name.as_deref();

    stop::stop_adapters(&project, name).await?;
    println!();
    start::start_adapters(&project, name).await
}
