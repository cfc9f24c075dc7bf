//! CLI error type and exit-code mapping.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use pgdev_bootstrap::BootstrapError;
use pgdev_config::ConfigError;
use pgdev_process::ProcessError;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => Self::failure(anyhow!(err.detail())),
            other => Self::validation(other.detail()),
        }
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::DuplicateProcess { name } => Self::validation(format!(
                "process '{name}' is produced by more than one instance"
            )),
            ProcessError::Serialize { source } => {
                Self::failure(anyhow!("failed to serialize process graph: {source}"))
            }
            ProcessError::Io { path, source } => {
                Self::failure(anyhow!("failed to write {}: {source}", path.display()))
            }
        }
    }
}

impl From<BootstrapError> for CliError {
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::Config { source, .. } => source.into(),
            other => Self::failure(anyhow!(describe_bootstrap(&other))),
        }
    }
}

fn describe_bootstrap(err: &BootstrapError) -> String {
    match err {
        BootstrapError::Config { source, .. } => source.detail(),
        BootstrapError::MissingBinary { name, searched } => format!(
            "{name} not found (searched {})",
            searched
                .iter()
                .map(|dir| dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        BootstrapError::MissingExtensionSupport { extension, reason } => extension
            .as_ref()
            .map_or_else(
                || format!("extensions requested but unavailable: {reason}"),
                |name| format!("extension '{name}' is not installed: {reason}"),
            ),
        BootstrapError::Spawn { command, source } => format!("failed to run {command}: {source}"),
        BootstrapError::CommandFailed { command, status } => status.map_or_else(
            || format!("{command} was terminated by a signal"),
            |code| format!("{command} exited with status {code}"),
        ),
        BootstrapError::ServerUnavailable { attempts } => {
            format!("server did not accept connections after {attempts} attempts")
        }
        BootstrapError::InitTimeout { step, timeout_secs } => {
            format!("{step} did not finish within {timeout_secs}s")
        }
        BootstrapError::SqlScriptFailure {
            operation,
            database,
            source,
        } => format!("{operation} failed against database '{database}': {source}"),
        BootstrapError::SchemaWalk { path, source } => {
            format!("failed to read schema directory {}: {source}", path.display())
        }
        BootstrapError::Io {
            operation,
            path,
            source,
        } => format!("{operation} {}: {source}", path.display()),
    }
}
