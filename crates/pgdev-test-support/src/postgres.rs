//! Disposable instance directories for integration tests without Docker.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use pgdev_config::{PackageConfig, PostgresConfig};
use tempfile::TempDir;

use crate::fixtures::{postgres_bin_dir, reserve_port};

/// A configuration rooted in a temporary directory.
///
/// The data directory, socket directory, and any schema files live under
/// [`TestInstance::root`] and are removed on drop. A server left running in
/// the data directory is stopped first.
pub struct TestInstance {
    dir: TempDir,
    config: PostgresConfig,
}

impl TestInstance {
    /// Instance named `name` on a free port, using binaries from
    /// [`postgres_bin_dir`] when available.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory or port cannot be
    /// allocated.
    pub fn new(name: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pgdev-")
            .tempdir()
            .context("failed to create instance directory")?;
        let config = PostgresConfig {
            data_dir: Some(dir.path().join("data")),
            socket_dir: Some(dir.path().join("sock")),
            port: reserve_port()?,
            package: PackageConfig {
                bin_dir: postgres_bin_dir(),
            },
            ..PostgresConfig::named(name)
        };
        Ok(Self { dir, config })
    }

    /// Root of the temporary directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Mutable configuration for per-test overrides.
    pub const fn config_mut(&mut self) -> &mut PostgresConfig {
        &mut self.config
    }

    /// Write `sql` to `relative` under the root and return its absolute path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file or its parent cannot be written.
    pub fn write_schema(&self, relative: &str, sql: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, sql).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl Drop for TestInstance {
    fn drop(&mut self) {
        let data_dir = self.config.data_dir();
        if !data_dir.join("postmaster.pid").exists() {
            return;
        }
        if let Some(bin_dir) = &self.config.package.bin_dir {
            let _ = Command::new(bin_dir.join("pg_ctl"))
                .arg("-D")
                .arg(&data_dir)
                .args(["-m", "immediate", "-w", "stop"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}
