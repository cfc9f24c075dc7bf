//! The init-process entry point.
//!
//! # Design
//! - Configuration files are rewritten on every run; database bootstrap runs
//!   only until the completion marker exists.
//! - The temporary server is stopped on every exit path once started.
//! - Validation happens before anything touches disk. Schema sources are
//!   expanded only once the marker shows the bootstrap still has to run.

use std::fs;

use pgdev_config::{PostgresConfig, RenderedFiles, current_user};
use serde::Serialize;
use tracing::{info, instrument};

use crate::binaries::Installation;
use crate::error::{BootstrapError, BootstrapResult};
use crate::executor::{PlanOutcome, execute_plan};
use crate::plan::BootstrapPlan;
use crate::postgres::PgSqlExecutor;
use crate::server::{TemporaryServer, initdb};

/// Summary of one bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// `initdb` ran during this invocation.
    pub initialized_cluster: bool,
    /// Database bootstrap was skipped because the marker already existed.
    pub skipped: bool,
    /// Plan execution results when the bootstrap ran.
    pub outcome: Option<PlanOutcome>,
}

/// Prepares one instance for its long-running server process.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    config: PostgresConfig,
    installation: Installation,
    user: String,
}

impl Bootstrapper {
    /// Bootstrapper with an explicit installation and invoking user.
    #[must_use]
    pub const fn new(config: PostgresConfig, installation: Installation, user: String) -> Self {
        Self {
            config,
            installation,
            user,
        }
    }

    /// Resolve the installation from `config.package` and the invoking user
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingBinary`] or a wrapped
    /// [`pgdev_config::ConfigError::UnknownUser`].
    pub fn from_config(config: PostgresConfig) -> BootstrapResult<Self> {
        let installation = Installation::resolve(&config.package)?;
        let user = current_user().map_err(|err| BootstrapError::config("bootstrap.user", err))?;
        Ok(Self::new(config, installation, user))
    }

    /// Role `initdb` creates and the bootstrap connects as.
    #[must_use]
    pub fn superuser(&self) -> &str {
        self.config.superuser.as_deref().unwrap_or(&self.user)
    }

    /// Ordered plan this bootstrapper would execute.
    ///
    /// # Errors
    ///
    /// See [`BootstrapPlan::from_config`].
    pub fn plan(&self) -> BootstrapResult<BootstrapPlan> {
        BootstrapPlan::from_config(&self.config, &self.user)
    }

    /// Initialise the data directory, write configuration files, and on the
    /// first start create databases and run the initial scripts.
    ///
    /// # Errors
    ///
    /// Returns the first failure; configuration problems surface before any
    /// process is launched.
    #[instrument(name = "bootstrap.run", skip(self), fields(instance = %self.config.name))]
    pub async fn run(&self) -> BootstrapResult<BootstrapReport> {
        self.config
            .validate()
            .map_err(|err| BootstrapError::config("bootstrap.validate", err))?;
        let files = RenderedFiles::render(&self.config)
            .map_err(|err| BootstrapError::config("bootstrap.render", err))?;
        self.installation
            .ensure_extensions(&self.config.extensions)
            .await?;

        let data_dir = self.config.data_dir();
        let socket_dir = self.config.effective_socket_dir();
        for dir in [&data_dir, &socket_dir] {
            fs::create_dir_all(dir)
                .map_err(|source| BootstrapError::io("bootstrap.create_dir", dir, source))?;
        }

        let mut report = BootstrapReport::default();
        if !self.config.cluster_exists() {
            initdb(&self.installation, &self.config, self.superuser()).await?;
            report.initialized_cluster = true;
        }
        files
            .write_to(&data_dir)
            .map_err(|err| BootstrapError::config("bootstrap.write_files", err))?;

        let marker = self.config.init_marker();
        if marker.exists() {
            info!("instance already bootstrapped");
            report.skipped = true;
            return Ok(report);
        }

        let plan = self.plan()?;
        let mut server = TemporaryServer::start(&self.installation, &self.config)?;
        let executed = self.execute(&mut server, &plan).await;
        let stopped = server.stop().await;
        let outcome = executed?;
        stopped?;

        fs::write(&marker, b"")
            .map_err(|source| BootstrapError::io("bootstrap.write_marker", &marker, source))?;
        info!(
            created = outcome.created.len(),
            existing = outcome.existing.len(),
            "bootstrap complete"
        );
        report.outcome = Some(outcome);
        Ok(report)
    }

    async fn execute(
        &self,
        server: &mut TemporaryServer,
        plan: &BootstrapPlan,
    ) -> BootstrapResult<PlanOutcome> {
        server.wait_until_ready(&self.config).await?;
        let mut sql = PgSqlExecutor::connect(&self.config, self.superuser()).await?;
        let outcome = execute_plan(plan, &mut sql, self.config.startup.step_timeout()).await?;
        sql.close().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgdev_config::DatabaseSpec;
    use std::path::PathBuf;

    fn installation() -> Installation {
        let missing = PathBuf::from("/nonexistent/bin/postgres");
        Installation {
            initdb: missing.clone(),
            postgres: missing.clone(),
            pg_ctl: missing.clone(),
            pg_isready: missing,
            pg_config: None,
        }
    }

    #[test]
    fn superuser_defaults_to_invoking_user() {
        let bootstrapper =
            Bootstrapper::new(PostgresConfig::named("pg1"), installation(), "alice".into());
        assert_eq!(bootstrapper.superuser(), "alice");

        let config = PostgresConfig {
            superuser: Some("postgres".into()),
            ..PostgresConfig::named("pg1")
        };
        let bootstrapper = Bootstrapper::new(config, installation(), "alice".into());
        assert_eq!(bootstrapper.superuser(), "postgres");
    }

    #[tokio::test]
    async fn invalid_config_fails_before_touching_disk() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempfile::tempdir()?;
        let data_dir = dir.path().join("data");
        let config = PostgresConfig {
            data_dir: Some(data_dir.clone()),
            initial_databases: vec![DatabaseSpec::empty("app"), DatabaseSpec::empty("app")],
            ..PostgresConfig::named("pg1")
        };
        let err = Bootstrapper::new(config, installation(), "alice".into())
            .run()
            .await
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(!data_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn marker_skips_bootstrap_even_when_schemas_moved()
    -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let data_dir = dir.path().join("data");
        let config = PostgresConfig {
            data_dir: Some(data_dir.clone()),
            initial_databases: vec![DatabaseSpec {
                name: "app".into(),
                schemas: Some(vec![dir.path().join("moved/schema.sql")]),
            }],
            ..PostgresConfig::named("pg1")
        };
        fs::create_dir_all(&data_dir)?;
        fs::write(data_dir.join("PG_VERSION"), "16\n")?;
        fs::write(config.init_marker(), b"")?;

        let report = Bootstrapper::new(config, installation(), "alice".into())
            .run()
            .await?;
        assert!(report.skipped);
        assert!(!report.initialized_cluster);
        assert!(report.outcome.is_none());
        assert!(data_dir.join("postgresql.conf").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn requested_extensions_need_pg_config() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let config = PostgresConfig {
            data_dir: Some(dir.path().join("data")),
            extensions: vec!["postgis".into()],
            ..PostgresConfig::named("pg1")
        };
        let err = Bootstrapper::new(config, installation(), "alice".into())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::MissingExtensionSupport { .. }
        ));
        assert!(!dir.path().join("data").exists());
        Ok(())
    }
}
