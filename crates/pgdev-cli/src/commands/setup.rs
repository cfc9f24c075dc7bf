use pgdev_bootstrap::Bootstrapper;
use pgdev_config::load_config;

use crate::cli::{ConfigArgs, OutputFormat};
use crate::error::CliResult;
use crate::output::render_report;

pub(crate) async fn handle_setup(args: &ConfigArgs, format: OutputFormat) -> CliResult<()> {
    let config = load_config(&args.config)?;
    let report = Bootstrapper::from_config(config)?.run().await?;
    render_report(&report, format)
}
