use pgdev_config::load_config;

use crate::cli::UriArgs;
use crate::error::{CliError, CliResult};

pub(crate) fn handle_uri(args: &UriArgs) -> CliResult<()> {
    if args.database.trim().is_empty() {
        return Err(CliError::validation("database name must not be empty"));
    }
    let config = load_config(&args.config)?;
    println!("{}", config.connection_uri(&args.database));
    Ok(())
}
