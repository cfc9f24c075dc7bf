//! Error types for configuration operations.
//!
//! # Design
//! - Constant error messages; context travels in structured fields.
//! - Shape errors (types, duplicates, ranges) are raised before any side effect.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting value was not a boolean, number, or string.
    #[error("invalid setting type")]
    InvalidSettingType {
        /// Setting key carrying the offending value.
        key: String,
        /// JSON kind that was supplied (`array`, `object`, `null`).
        kind: &'static str,
    },
    /// Two initial databases share a name.
    #[error("duplicate database name")]
    DuplicateDatabaseName {
        /// Name that appeared more than once.
        name: String,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The invoking user could not be determined.
    #[error("unable to determine invoking user")]
    UnknownUser,
    /// Configuration document was not valid JSON for the model.
    #[error("invalid configuration document")]
    Json {
        /// Path of the document.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
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

impl ConfigError {
    pub(crate) const fn invalid(field: &'static str, reason: &'static str, value: Option<String>) -> Self {
        Self::InvalidField {
            field,
            reason,
            value,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Human-readable summary including the structured context.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidSettingType { key, kind } => {
                format!("setting '{key}' must be a boolean, number, or string (got {kind})")
            }
            Self::DuplicateDatabaseName { name } => {
                format!("initial database '{name}' is declared more than once")
            }
            Self::InvalidField {
                field,
                reason,
                value,
            } => value.as_ref().map_or_else(
                || format!("{field}: {reason}"),
                |value| format!("{field}: {reason} (got '{value}')"),
            ),
            Self::UnknownUser => self.to_string(),
            Self::Json { path, source } => format!("{}: {source}", path.display()),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{operation} {}: {source}", path.display()),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_context_fields() {
        let err = ConfigError::InvalidSettingType {
            key: "shared_buffers".into(),
            kind: "array",
        };
        assert_eq!(err.to_string(), "invalid setting type");
        assert!(err.detail().contains("shared_buffers"));

        let err = ConfigError::invalid("port", "must be between 1 and 65535", Some("0".into()));
        assert_eq!(err.detail(), "port: must be between 1 and 65535 (got '0')");
    }
}
