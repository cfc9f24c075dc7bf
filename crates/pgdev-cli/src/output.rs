//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use pgdev_bootstrap::{BootstrapPlan, BootstrapReport, BootstrapStep};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::commands::RenderSummary;
use crate::error::{CliError, CliResult};

pub(crate) fn render_summary(summary: &RenderSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => {
            println!("{:<20} {:<48} HBA", "INSTANCE", "CONFIG");
            for instance in &summary.instances {
                println!(
                    "{:<20} {:<48} {}",
                    instance.name,
                    instance.postgresql_conf.display(),
                    instance.pg_hba_conf.display()
                );
            }
            println!("processes: {}", summary.processes.join(", "));
            if !summary.external_dependencies.is_empty() {
                println!(
                    "external dependencies: {}",
                    summary.external_dependencies.join(", ")
                );
            }
            println!("written: {}", summary.process_document.display());
        }
    }
    Ok(())
}

pub(crate) fn render_plan(plan: &BootstrapPlan, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(plan)?,
        OutputFormat::Table => {
            if plan.is_empty() {
                println!("nothing to bootstrap");
            }
            for line in plan_lines(plan) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_report(report: &BootstrapReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("cluster initialised: {}", yes_no(report.initialized_cluster));
            if report.skipped {
                println!("bootstrap: already complete");
            }
            if let Some(outcome) = &report.outcome {
                println!("created: {}", list_or_dash(&outcome.created));
                println!("existing: {}", list_or_dash(&outcome.existing));
                println!("schemas applied: {}", outcome.schemas_applied);
                println!("scripts run: {}", outcome.scripts_run);
            }
        }
    }
    Ok(())
}

fn plan_lines(plan: &BootstrapPlan) -> Vec<String> {
    plan.steps
        .iter()
        .enumerate()
        .flat_map(|(index, step)| {
            let mut lines = vec![format!("{:>2}. {}", index + 1, step.describe())];
            if let BootstrapStep::EnsureDatabase { schemas, .. } = step {
                lines.extend(
                    schemas
                        .iter()
                        .map(|schema| format!("      schema {}", schema.display())),
                );
            }
            lines
        })
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
