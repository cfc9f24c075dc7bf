use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use pgdev_config::{PostgresConfig, RenderedFiles, load_config};
use pgdev_process::{GraphInputs, InstanceCommands, ProcessGraph};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{OutputFormat, RenderArgs};
use crate::error::{CliError, CliResult};
use crate::output::render_summary;

/// File name of the supervisor document written next to the instance folders.
pub(crate) const PROCESS_DOCUMENT: &str = "process-compose.json";

/// What `render` produced.
#[derive(Debug, Serialize)]
pub(crate) struct RenderSummary {
    pub(crate) instances: Vec<RenderedInstance>,
    pub(crate) process_document: PathBuf,
    pub(crate) processes: Vec<String>,
    pub(crate) external_dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenderedInstance {
    pub(crate) name: String,
    pub(crate) postgresql_conf: PathBuf,
    pub(crate) pg_hba_conf: PathBuf,
}

pub(crate) fn handle_render(args: &RenderArgs, format: OutputFormat) -> CliResult<()> {
    let pgdev = std::env::current_exe()
        .context("failed to locate the pgdev executable")
        .map_err(CliError::failure)?;
    let summary = render_instances(&args.configs, &args.out, &pgdev)?;
    render_summary(&summary, format)
}

/// Load every configuration, build the merged process graph, then write the
/// per-instance files and the supervisor document under `out`.
pub(crate) fn render_instances(
    configs: &[PathBuf],
    out: &Path,
    pgdev: &Path,
) -> CliResult<RenderSummary> {
    let mut graph = ProcessGraph::new();
    let mut rendered: Vec<(PostgresConfig, RenderedFiles)> = Vec::with_capacity(configs.len());
    for path in configs {
        let config = load_config(path)?;
        let config_path = std::path::absolute(path)
            .map_err(|err| CliError::failure(anyhow!("failed to resolve {}: {err}", path.display())))?;
        let commands = InstanceCommands::for_config(&config, pgdev, &config_path);
        graph.merge(ProcessGraph::build(&GraphInputs::from_config(&config, commands)))?;
        let files = RenderedFiles::render(&config)?;
        rendered.push((config, files));
    }

    let mut instances = Vec::with_capacity(rendered.len());
    for (config, files) in &rendered {
        let written = files.write_to(&out.join(&config.name))?;
        info!(instance = %config.name, "rendered configuration files");
        instances.push(RenderedInstance {
            name: config.name.clone(),
            postgresql_conf: written.postgresql_conf,
            pg_hba_conf: written.pg_hba_conf,
        });
    }

    std::fs::create_dir_all(out)
        .map_err(|err| CliError::failure(anyhow!("failed to create {}: {err}", out.display())))?;
    let process_document = out.join(PROCESS_DOCUMENT);
    graph.write_to(&process_document)?;
    let external_dependencies: Vec<String> = graph
        .external_dependencies()
        .into_iter()
        .map(str::to_string)
        .collect();
    for name in &external_dependencies {
        warn!(process = %name, "dependency is not defined by any rendered instance");
    }

    Ok(RenderSummary {
        instances,
        process_document,
        processes: graph.names().map(str::to_string).collect(),
        external_dependencies,
    })
}
