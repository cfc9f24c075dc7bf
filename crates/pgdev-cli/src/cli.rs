//! Argument parsing, logging setup, and dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pgdev_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use tracing::debug;

use crate::commands::{handle_plan, handle_render, handle_setup, handle_uri};
use crate::error::CliResult;

/// Parses CLI arguments, installs logging, and executes the requested
/// command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: LoggingConfig::default().build_sha,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging unavailable: {err}");
    }
    debug!(command = command_label(&cli.command), build = build_sha(), "starting");

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Render(args) => handle_render(&args, cli.output),
        Command::Setup(args) => handle_setup(&args, cli.output).await,
        Command::Plan(args) => handle_plan(&args, cli.output),
        Command::Uri(args) => handle_uri(&args),
    }
}

#[derive(Parser)]
#[command(
    name = "pgdev",
    about = "Declarative local PostgreSQL instances for development environments"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "PGDEV_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level or filter directive; RUST_LOG takes precedence"
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        help = "Log output format: pretty or json"
    )]
    log_format: Option<LogFormat>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Validate configurations and write generated files and the process graph.
    Render(RenderArgs),
    /// Initialise the data directory and bootstrap databases (init process body).
    Setup(ConfigArgs),
    /// Print the bootstrap plan without touching the instance.
    Plan(ConfigArgs),
    /// Print the connection URI for a database of the instance.
    Uri(UriArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RenderArgs {
    #[arg(
        long = "config",
        required = true,
        num_args = 1..,
        help = "Instance configuration files (JSON)"
    )]
    pub(crate) configs: Vec<PathBuf>,
    #[arg(long, help = "Directory receiving generated files")]
    pub(crate) out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ConfigArgs {
    #[arg(long, help = "Instance configuration file (JSON)")]
    pub(crate) config: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct UriArgs {
    #[arg(long, help = "Instance configuration file (JSON)")]
    pub(crate) config: PathBuf,
    #[arg(long, default_value = "postgres", help = "Database name")]
    pub(crate) database: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value
        .parse::<LogFormat>()
        .map_err(|err| format!("{err} '{value}' (expected pretty or json)"))
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Render(_) => "render",
        Command::Setup(_) => "setup",
        Command::Plan(_) => "plan",
        Command::Uri(_) => "uri",
    }
}
