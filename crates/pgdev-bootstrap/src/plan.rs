//! Ordered bootstrap plan.
//!
//! # Design
//! - The `before` script is always first and the `after` script always last,
//!   whichever database branch is taken.
//! - Schema directories are expanded to their `*.sql` files in name order
//!   while the plan is built, so a missing source fails before the temporary
//!   server starts. Other files in those directories are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use pgdev_config::{DatabaseSpec, InitialScript, PostgresConfig, validate_databases};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{BootstrapError, BootstrapResult};

/// Where a free-form script runs relative to database creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    /// Before any database is created.
    Before,
    /// After every database and schema step.
    After,
}

impl ScriptPhase {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// One bootstrap step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BootstrapStep {
    /// Run SQL against the maintenance database.
    RunScript {
        /// Position relative to database creation.
        phase: ScriptPhase,
        /// SQL text.
        sql: String,
    },
    /// Create `name` when absent; apply `schemas` in order when it was created.
    EnsureDatabase {
        /// Database name.
        name: String,
        /// Schema files, directories already expanded.
        schemas: Vec<PathBuf>,
    },
}

impl BootstrapStep {
    /// Short description used in logs and timeouts.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RunScript { phase, .. } => format!("{} script", phase.as_str()),
            Self::EnsureDatabase { name, .. } => format!("database {name}"),
        }
    }
}

/// Ordered steps run on the first start of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapPlan {
    /// Steps in execution order.
    pub steps: Vec<BootstrapStep>,
}

impl BootstrapPlan {
    /// Plan for `config`, naming the default database after `user`.
    ///
    /// # Errors
    ///
    /// See [`plan`].
    pub fn from_config(config: &PostgresConfig, user: &str) -> BootstrapResult<Self> {
        plan(
            &config.initial_databases,
            &config.initial_script,
            config.create_database,
            user,
        )
    }

    /// Whether there is nothing to run.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of databases the plan ensures, in order.
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            BootstrapStep::EnsureDatabase { name, .. } => Some(name.as_str()),
            BootstrapStep::RunScript { .. } => None,
        })
    }
}

/// Build the bootstrap plan.
///
/// # Errors
///
/// Returns [`BootstrapError::Config`] wrapping
/// [`pgdev_config::ConfigError::DuplicateDatabaseName`] for repeated names,
/// [`BootstrapError::Io`] for a missing schema source, or
/// [`BootstrapError::SchemaWalk`] when a schema directory cannot be read.
pub fn plan(
    databases: &[DatabaseSpec],
    initial_script: &InitialScript,
    create_default_db: bool,
    default_db_name: &str,
) -> BootstrapResult<BootstrapPlan> {
    validate_databases(databases).map_err(|err| BootstrapError::config("plan.validate", err))?;

    let mut steps = Vec::new();
    if let Some(sql) = &initial_script.before {
        steps.push(BootstrapStep::RunScript {
            phase: ScriptPhase::Before,
            sql: sql.clone(),
        });
    }

    if databases.is_empty() {
        if create_default_db {
            steps.push(BootstrapStep::EnsureDatabase {
                name: default_db_name.to_string(),
                schemas: Vec::new(),
            });
        }
    } else {
        for database in databases {
            let schemas = database
                .schemas
                .as_deref()
                .map(expand_sources)
                .transpose()?
                .unwrap_or_default();
            steps.push(BootstrapStep::EnsureDatabase {
                name: database.name.clone(),
                schemas,
            });
        }
    }

    if let Some(sql) = &initial_script.after {
        steps.push(BootstrapStep::RunScript {
            phase: ScriptPhase::After,
            sql: sql.clone(),
        });
    }

    Ok(BootstrapPlan { steps })
}

fn expand_sources(sources: &[PathBuf]) -> BootstrapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for source in sources {
        let metadata =
            fs::metadata(source).map_err(|err| BootstrapError::io("plan.schema", source, err))?;
        if metadata.is_dir() {
            files.extend(directory_files(source)?);
        } else {
            files.push(source.clone());
        }
    }
    Ok(files)
}

fn directory_files(dir: &Path) -> BootstrapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| BootstrapError::SchemaWalk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_sql(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_sql(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("sql"))
}
