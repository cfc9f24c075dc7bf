//! `initdb` and the temporary socket-only server used during bootstrap.
//!
//! # Design
//! - The temporary server never listens on TCP (`listen_addresses=''`), so a
//!   half-initialised instance is unreachable from outside.
//! - Readiness is polled with `pg_isready` for a bounded number of attempts.
//! - Stopping prefers a fast `pg_ctl` shutdown and falls back to killing the
//!   child; `kill_on_drop` covers early returns.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use pgdev_config::{PostgresConfig, StartupConfig};
use pgdev_config::defaults::PROBE_DATABASE;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::binaries::Installation;
use crate::error::{BootstrapError, BootstrapResult};

/// Run `initdb` for `config` with `superuser` as the bootstrap superuser.
///
/// # Errors
///
/// Returns [`BootstrapError::Spawn`] when `initdb` cannot be launched or
/// [`BootstrapError::CommandFailed`] when it exits unsuccessfully.
#[instrument(name = "bootstrap.initdb", skip(installation, config), fields(instance = %config.name))]
pub async fn initdb(
    installation: &Installation,
    config: &PostgresConfig,
    superuser: &str,
) -> BootstrapResult<()> {
    let data_dir = config.data_dir();
    info!(data_dir = %data_dir.display(), "initialising data directory");
    let status = Command::new(&installation.initdb)
        .arg("-D")
        .arg(&data_dir)
        .arg("-U")
        .arg(superuser)
        .args(&config.initdb_args)
        .stdout(Stdio::null())
        .status()
        .await
        .map_err(|source| BootstrapError::Spawn {
            command: "initdb",
            source,
        })?;
    check_status("initdb", status)
}

/// A `postgres` process reachable only through its unix socket.
#[derive(Debug)]
pub struct TemporaryServer {
    child: Child,
    pg_ctl: PathBuf,
    pg_isready: PathBuf,
    data_dir: PathBuf,
    socket_dir: PathBuf,
    port: u16,
}

impl TemporaryServer {
    /// Launch the server for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Spawn`] when `postgres` cannot be launched.
    #[instrument(name = "bootstrap.server_start", skip(installation, config), fields(instance = %config.name))]
    pub fn start(installation: &Installation, config: &PostgresConfig) -> BootstrapResult<Self> {
        let data_dir = config.data_dir();
        let socket_dir = config.effective_socket_dir();
        let port = config.effective_port();
        let child = Command::new(&installation.postgres)
            .arg("-D")
            .arg(&data_dir)
            .arg("-c")
            .arg("listen_addresses=")
            .arg("-c")
            .arg(format!("unix_socket_directories={}", socket_dir.display()))
            .arg("-p")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BootstrapError::Spawn {
                command: "postgres",
                source,
            })?;
        debug!(pid = ?child.id(), "temporary server launched");
        Ok(Self {
            child,
            pg_ctl: installation.pg_ctl.clone(),
            pg_isready: installation.pg_isready.clone(),
            data_dir,
            socket_dir,
            port,
        })
    }

    /// Poll `pg_isready` until the server accepts connections.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::ServerUnavailable`] when the retry budget is
    /// exhausted and [`BootstrapError::CommandFailed`] when the server exits
    /// while being waited on.
    pub async fn wait_until_ready(&mut self, config: &PostgresConfig) -> BootstrapResult<()> {
        let mut polls = ReadinessPolls::new(&config.startup);
        while let Some(attempt) = polls.next_attempt().await {
            if let Some(status) = self.child.try_wait().map_err(|source| BootstrapError::Spawn {
                command: "postgres",
                source,
            })? {
                return Err(BootstrapError::CommandFailed {
                    command: "postgres",
                    status: status.code(),
                });
            }
            let ready = Command::new(&self.pg_isready)
                .arg("-h")
                .arg(&self.socket_dir)
                .arg("-p")
                .arg(self.port.to_string())
                .arg("-d")
                .arg(PROBE_DATABASE)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .is_ok_and(|status| status.success());
            if ready {
                debug!(attempt, "temporary server accepting connections");
                return Ok(());
            }
        }
        Err(BootstrapError::ServerUnavailable {
            attempts: config.startup.max_attempts,
        })
    }

    /// Stop the server and wait for the child to exit.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Spawn`] when the child cannot be reaped.
    #[instrument(name = "bootstrap.server_stop", skip(self))]
    pub async fn stop(mut self) -> BootstrapResult<()> {
        let stopped = Command::new(&self.pg_ctl)
            .arg("-D")
            .arg(&self.data_dir)
            .args(["-m", "fast", "-w", "stop"])
            .stdout(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success());
        if !stopped {
            warn!("pg_ctl stop failed; killing temporary server");
            self.child
                .start_kill()
                .map_err(|source| BootstrapError::Spawn {
                    command: "postgres",
                    source,
                })?;
        }
        self.child
            .wait()
            .await
            .map_err(|source| BootstrapError::Spawn {
                command: "postgres",
                source,
            })?;
        info!("temporary server stopped");
        Ok(())
    }
}

/// Attempt counter for readiness polling. The retry interval is slept between
/// attempts only, never after the last one.
struct ReadinessPolls {
    attempt: u32,
    max_attempts: u32,
    interval: Duration,
}

impl ReadinessPolls {
    const fn new(startup: &StartupConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: startup.max_attempts,
            interval: startup.retry_interval(),
        }
    }

    /// Wait for the next attempt and return its number, or `None` once the
    /// budget is spent.
    async fn next_attempt(&mut self) -> Option<u32> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        if self.attempt > 0 {
            sleep(self.interval).await;
        }
        self.attempt += 1;
        Some(self.attempt)
    }
}

fn check_status(command: &'static str, status: ExitStatus) -> BootstrapResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(BootstrapError::CommandFailed {
            command,
            status: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn non_zero_exit_is_command_failed() {
        assert!(check_status("initdb", ExitStatus::from_raw(0)).is_ok());
        let err = check_status("initdb", ExitStatus::from_raw(1 << 8)).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::CommandFailed {
                command: "initdb",
                status: Some(1)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_polls_do_not_sleep_after_the_last_attempt() {
        let startup = StartupConfig {
            max_attempts: 3,
            retry_interval_ms: 10_000,
            ..StartupConfig::default()
        };
        let mut polls = ReadinessPolls::new(&startup);
        let started = tokio::time::Instant::now();
        let mut attempts = Vec::new();
        while let Some(attempt) = polls.next_attempt().await {
            attempts.push(attempt);
        }
        assert_eq!(attempts, vec![1, 2, 3]);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn missing_initdb_is_a_spawn_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("bin/initdb");
        let installation = Installation {
            initdb: missing.clone(),
            postgres: missing.clone(),
            pg_ctl: missing.clone(),
            pg_isready: missing,
            pg_config: None,
        };
        let config = PostgresConfig {
            data_dir: Some(dir.path().join("data")),
            ..PostgresConfig::named("pg1")
        };
        let err = initdb(&installation, &config, "alice").await.unwrap_err();
        assert!(matches!(err, BootstrapError::Spawn { command: "initdb", .. }));
        Ok(())
    }
}
