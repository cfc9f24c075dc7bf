//! Plan execution over an abstract SQL backend.
//!
//! # Design
//! - [`SqlExecutor`] is the seam between step ordering and the database driver,
//!   so ordering and idempotence are testable without a server.
//! - Every SQL operation runs under the caller's step budget; exceeding it is
//!   [`BootstrapError::InitTimeout`], never a hang.
//! - A failing step aborts the run; nothing is retried.
//! - Creating a database and applying its schemas is all-or-nothing: a schema
//!   failure drops the database again so the next run starts from scratch.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{BootstrapError, BootstrapResult};
use crate::plan::{BootstrapPlan, BootstrapStep};

/// SQL operations needed by the bootstrap.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Whether `name` exists in `pg_database`.
    async fn database_exists(&mut self, name: &str) -> BootstrapResult<bool>;
    /// Create `name`.
    async fn create_database(&mut self, name: &str) -> BootstrapResult<()>;
    /// Drop `name` if it exists, terminating any session still attached.
    async fn drop_database(&mut self, name: &str) -> BootstrapResult<()>;
    /// Run `sql` as a multi-statement script against `database`, or the
    /// maintenance database when `None`.
    async fn run_script(&mut self, database: Option<&str>, sql: &str) -> BootstrapResult<()>;
}

/// What a plan run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanOutcome {
    /// Databases created by this run.
    pub created: Vec<String>,
    /// Databases that already existed; they were left untouched.
    pub existing: Vec<String>,
    /// Schema files applied.
    pub schemas_applied: usize,
    /// `before`/`after` scripts run.
    pub scripts_run: usize,
}

/// Run `plan` step by step.
///
/// # Errors
///
/// Returns the first step failure: [`BootstrapError::SqlScriptFailure`] from
/// the executor, [`BootstrapError::Io`] when a schema file cannot be read, or
/// [`BootstrapError::InitTimeout`] when an operation exceeds `step_timeout`.
/// A database whose schemas fail is dropped before the error is returned.
#[instrument(name = "bootstrap.execute_plan", skip_all, fields(steps = plan.steps.len()))]
pub async fn execute_plan(
    plan: &BootstrapPlan,
    sql: &mut dyn SqlExecutor,
    step_timeout: Duration,
) -> BootstrapResult<PlanOutcome> {
    let mut outcome = PlanOutcome::default();
    for step in &plan.steps {
        let label = step.describe();
        match step {
            BootstrapStep::RunScript { sql: script, .. } => {
                info!(step = %label, "running script");
                bounded(&label, step_timeout, sql.run_script(None, script)).await?;
                outcome.scripts_run += 1;
            }
            BootstrapStep::EnsureDatabase { name, schemas } => {
                if bounded(&label, step_timeout, sql.database_exists(name)).await? {
                    info!(database = %name, "database already exists; leaving it untouched");
                    outcome.existing.push(name.clone());
                    continue;
                }
                info!(database = %name, "creating database");
                bounded(&label, step_timeout, sql.create_database(name)).await?;
                let applied = match apply_schemas(name, schemas, sql, step_timeout).await {
                    Ok(applied) => applied,
                    Err(err) => {
                        discard_database(name, sql, step_timeout).await;
                        return Err(err);
                    }
                };
                outcome.created.push(name.clone());
                outcome.schemas_applied += applied;
            }
        }
    }
    Ok(outcome)
}

async fn apply_schemas(
    database: &str,
    schemas: &[PathBuf],
    sql: &mut dyn SqlExecutor,
    step_timeout: Duration,
) -> BootstrapResult<usize> {
    for schema in schemas {
        let text = read_schema(schema).await?;
        info!(database = %database, schema = %schema.display(), "applying schema");
        let label = format!("database {database} schema {}", schema.display());
        bounded(&label, step_timeout, sql.run_script(Some(database), &text)).await?;
    }
    Ok(schemas.len())
}

async fn discard_database(name: &str, sql: &mut dyn SqlExecutor, step_timeout: Duration) {
    let label = format!("drop database {name}");
    match bounded(&label, step_timeout, sql.drop_database(name)).await {
        Ok(()) => warn!(database = %name, "schema failed; dropped the partially built database"),
        Err(err) => warn!(
            database = %name,
            error = %err,
            "schema failed and the partially built database could not be dropped"
        ),
    }
}

async fn read_schema(path: &Path) -> BootstrapResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::io("bootstrap.read_schema", path, source))
}

pub(crate) async fn bounded<T: Send>(
    step: &str,
    budget: Duration,
    operation: impl Future<Output = BootstrapResult<T>> + Send,
) -> BootstrapResult<T> {
    tokio::time::timeout(budget, operation)
        .await
        .map_err(|_| BootstrapError::InitTimeout {
            step: step.to_string(),
            timeout_secs: budget.as_secs(),
        })?
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;

    use super::*;
    use crate::plan::plan;
    use pgdev_config::{DatabaseSpec, InitialScript};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Exists(String),
        Create(String),
        Drop(String),
        Script(Option<String>, String),
    }

    #[derive(Default)]
    struct RecordingExecutor {
        databases: BTreeSet<String>,
        calls: Vec<Call>,
        fail_on: Option<String>,
        stall: bool,
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn database_exists(&mut self, name: &str) -> BootstrapResult<bool> {
            self.calls.push(Call::Exists(name.to_string()));
            Ok(self.databases.contains(name))
        }

        async fn create_database(&mut self, name: &str) -> BootstrapResult<()> {
            self.calls.push(Call::Create(name.to_string()));
            self.databases.insert(name.to_string());
            Ok(())
        }

        async fn drop_database(&mut self, name: &str) -> BootstrapResult<()> {
            self.calls.push(Call::Drop(name.to_string()));
            self.databases.remove(name);
            Ok(())
        }

        async fn run_script(&mut self, database: Option<&str>, sql: &str) -> BootstrapResult<()> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.calls
                .push(Call::Script(database.map(str::to_string), sql.to_string()));
            if self.fail_on.as_deref() == Some(sql) {
                return Err(BootstrapError::SqlScriptFailure {
                    operation: "test.run_script",
                    database: database.unwrap_or("postgres").to_string(),
                    source: sqlx::Error::Protocol("syntax error".into()),
                });
            }
            Ok(())
        }
    }

    const BUDGET: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn schemas_apply_in_declared_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.sql");
        let b = dir.path().join("b.sql");
        fs::write(&a, "CREATE TABLE a ();")?;
        fs::write(&b, "CREATE TABLE b ();")?;
        let databases = vec![DatabaseSpec {
            name: "foo".into(),
            schemas: Some(vec![a, b]),
        }];
        let plan = plan(&databases, &InitialScript::default(), true, "alice")?;

        let mut executor = RecordingExecutor::default();
        let outcome = execute_plan(&plan, &mut executor, BUDGET).await?;
        assert_eq!(
            executor.calls,
            vec![
                Call::Exists("foo".into()),
                Call::Create("foo".into()),
                Call::Script(Some("foo".into()), "CREATE TABLE a ();".into()),
                Call::Script(Some("foo".into()), "CREATE TABLE b ();".into()),
            ]
        );
        assert_eq!(outcome.created, vec!["foo"]);
        assert_eq!(outcome.schemas_applied, 2);
        Ok(())
    }

    #[tokio::test]
    async fn before_first_after_last_with_default_database() -> BootstrapResult<()> {
        let script = InitialScript {
            before: Some("CREATE ROLE app".into()),
            after: Some("GRANT ALL ON DATABASE alice TO app".into()),
        };
        let plan = plan(&[], &script, true, "alice")?;
        let mut executor = RecordingExecutor::default();
        execute_plan(&plan, &mut executor, BUDGET).await?;
        assert_eq!(
            executor.calls.first(),
            Some(&Call::Script(None, "CREATE ROLE app".into()))
        );
        assert_eq!(
            executor.calls.last(),
            Some(&Call::Script(
                None,
                "GRANT ALL ON DATABASE alice TO app".into()
            ))
        );
        let creates: Vec<_> = executor
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .collect();
        assert_eq!(creates, vec![&Call::Create("alice".into())]);
        Ok(())
    }

    #[tokio::test]
    async fn rerun_creates_nothing_new() -> BootstrapResult<()> {
        let plan = plan(
            &[DatabaseSpec::empty("app")],
            &InitialScript::default(),
            true,
            "alice",
        )?;
        let mut executor = RecordingExecutor::default();
        let first = execute_plan(&plan, &mut executor, BUDGET).await?;
        let second = execute_plan(&plan, &mut executor, BUDGET).await?;
        assert_eq!(first.created, vec!["app"]);
        assert!(second.created.is_empty());
        assert_eq!(second.existing, vec!["app"]);
        assert_eq!(executor.databases.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failing_script_aborts_remaining_steps() -> BootstrapResult<()> {
        let script = InitialScript {
            before: Some("broken".into()),
            after: Some("never".into()),
        };
        let plan = plan(&[DatabaseSpec::empty("app")], &script, true, "alice")?;
        let mut executor = RecordingExecutor {
            fail_on: Some("broken".into()),
            ..RecordingExecutor::default()
        };
        let err = execute_plan(&plan, &mut executor, BUDGET).await.unwrap_err();
        assert!(matches!(err, BootstrapError::SqlScriptFailure { .. }));
        assert_eq!(executor.calls.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_schema_drops_database_so_rerun_rebuilds_it()
    -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.sql");
        let b = dir.path().join("b.sql");
        fs::write(&a, "A")?;
        fs::write(&b, "B")?;
        let databases = vec![DatabaseSpec {
            name: "foo".into(),
            schemas: Some(vec![a, b]),
        }];
        let plan = plan(&databases, &InitialScript::default(), false, "alice")?;
        let mut executor = RecordingExecutor {
            fail_on: Some("B".into()),
            ..RecordingExecutor::default()
        };

        let err = execute_plan(&plan, &mut executor, BUDGET).await.unwrap_err();
        assert!(matches!(err, BootstrapError::SqlScriptFailure { .. }));
        assert_eq!(executor.calls.last(), Some(&Call::Drop("foo".into())));
        assert!(executor.databases.is_empty());

        executor.fail_on = None;
        executor.calls.clear();
        let outcome = execute_plan(&plan, &mut executor, BUDGET).await?;
        assert_eq!(outcome.created, vec!["foo"]);
        assert!(outcome.existing.is_empty());
        assert_eq!(outcome.schemas_applied, 2);
        assert_eq!(
            executor.calls,
            vec![
                Call::Exists("foo".into()),
                Call::Create("foo".into()),
                Call::Script(Some("foo".into()), "A".into()),
                Call::Script(Some("foo".into()), "B".into()),
            ]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_step_times_out() -> BootstrapResult<()> {
        let script = InitialScript {
            before: Some("SELECT pg_sleep(600)".into()),
            after: None,
        };
        let plan = plan(&[], &script, false, "alice")?;
        let mut executor = RecordingExecutor {
            stall: true,
            ..RecordingExecutor::default()
        };
        let err = execute_plan(&plan, &mut executor, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InitTimeout { timeout_secs: 1, .. }
        ));
        Ok(())
    }
}
