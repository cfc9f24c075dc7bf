//! # Design
//!
//! - Constant messages; operation, path, and database context travel in fields.
//! - Configuration-shape errors surface before any process is launched.
//! - Runtime failures abort the init process; nothing here is retried except the
//!   readiness wait, whose exhaustion is [`BootstrapError::ServerUnavailable`].

use std::io;
use std::path::PathBuf;

use pgdev_config::ConfigError;
use thiserror::Error;

/// Result alias for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors raised while initialising an instance.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration was invalid or could not be rendered.
    #[error("configuration error")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// A required binary was not found.
    #[error("postgres binary not found")]
    MissingBinary {
        /// Binary name.
        name: &'static str,
        /// Directories searched.
        searched: Vec<PathBuf>,
    },
    /// Extensions were requested but the installation cannot provide them.
    #[error("missing extension support")]
    MissingExtensionSupport {
        /// Extension that could not be found, when a specific one failed.
        extension: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// An external command could not be spawned.
    #[error("failed to spawn command")]
    Spawn {
        /// Command identifier.
        command: &'static str,
        /// Source IO error.
        source: io::Error,
    },
    /// An external command exited unsuccessfully.
    #[error("command exited with failure status")]
    CommandFailed {
        /// Command identifier.
        command: &'static str,
        /// Exit code, when the process was not killed by a signal.
        status: Option<i32>,
    },
    /// The server did not accept connections within the retry budget.
    #[error("server unavailable")]
    ServerUnavailable {
        /// Readiness polls attempted.
        attempts: u32,
    },
    /// A bootstrap step exceeded its time budget.
    #[error("initialisation step timed out")]
    InitTimeout {
        /// Step description.
        step: String,
        /// Budget in seconds.
        timeout_secs: u64,
    },
    /// A SQL step failed.
    #[error("sql script failed")]
    SqlScriptFailure {
        /// Operation identifier.
        operation: &'static str,
        /// Database the statement ran against.
        database: String,
        /// Source database error.
        source: sqlx::Error,
    },
    /// Schema directory traversal failed.
    #[error("schema directory traversal failed")]
    SchemaWalk {
        /// Directory being traversed.
        path: PathBuf,
        /// Source walkdir error.
        source: walkdir::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl BootstrapError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the failure stems from the configuration shape rather than the
    /// runtime environment.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = BootstrapError::config(
            "plan.validate",
            ConfigError::DuplicateDatabaseName { name: "app".into() },
        );
        assert_eq!(err.to_string(), "configuration error");
        assert!(err.is_config_error());
        assert!(err.source().is_some());

        let err = BootstrapError::ServerUnavailable { attempts: 3 };
        assert_eq!(err.to_string(), "server unavailable");
        assert!(!err.is_config_error());
        assert!(err.source().is_none());

        let err = BootstrapError::io("plan.schema", "/missing.sql", io::Error::other("gone"));
        assert!(err.source().is_some());
    }
}
