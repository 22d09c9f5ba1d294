use crate::cli::LogsArgs;
use crate::common::ProjectTarget;
use colored::*;
use std::io::IsTerminal;

pub async fn execute(target: &ProjectTarget, args: LogsArgs) -> anyhow::Result<()> {
    let project = target.open().await?;
    let selected = project.select(args.name.as_deref())?;

    let use_colors = !args.no_colors && std::io::stdout().is_terminal();
    colored::control::set_override(use_colors);

    for (index, adapter) in selected.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!(
            "{} {} {}",
            "━━━".dimmed(),
            adapter.name().bold(),
            format!("({})", adapter.log_file().display()).dimmed()
        );

        for line in devctl_logging::tail(adapter.log_file(), args.lines).await? {
            println!("{}", format_log_line(&line));
        }
    }
    Ok(())
}

fn format_log_line(line: &str) -> String {
    let lower = line.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("panic") {
        line.red().to_string()
    } else if lower.contains("warn") {
        line.yellow().to_string()
    } else {
        line.to_string()
    }
}
