use pgdev_bootstrap::BootstrapPlan;
use pgdev_config::{current_user, load_config};

use crate::cli::{ConfigArgs, OutputFormat};
use crate::error::CliResult;
use crate::output::render_plan;

pub(crate) fn handle_plan(args: &ConfigArgs, format: OutputFormat) -> CliResult<()> {
    let config = load_config(&args.config)?;
    let plan = BootstrapPlan::from_config(&config, &current_user()?)?;
    render_plan(&plan, format)
}
