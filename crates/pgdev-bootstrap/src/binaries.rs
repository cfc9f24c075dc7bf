//! Locating the `PostgreSQL` installation.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use pgdev_config::PackageConfig;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BootstrapError, BootstrapResult};

/// Resolved server binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// `initdb`.
    pub initdb: PathBuf,
    /// `postgres`.
    pub postgres: PathBuf,
    /// `pg_ctl`.
    pub pg_ctl: PathBuf,
    /// `pg_isready`.
    pub pg_isready: PathBuf,
    /// `pg_config`, when the installation ships it.
    pub pg_config: Option<PathBuf>,
}

impl Installation {
    /// Resolve binaries from `package.bin_dir`, or from well-known locations
    /// and `PATH` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingBinary`] naming the first binary that
    /// is absent.
    pub fn resolve(package: &PackageConfig) -> BootstrapResult<Self> {
        let dirs = package
            .bin_dir
            .as_ref()
            .map_or_else(search_dirs, |dir| vec![dir.clone()]);
        let installation = Self {
            initdb: resolve_binary("initdb", &dirs)?,
            postgres: resolve_binary("postgres", &dirs)?,
            pg_ctl: resolve_binary("pg_ctl", &dirs)?,
            pg_isready: resolve_binary("pg_isready", &dirs)?,
            pg_config: resolve_binary("pg_config", &dirs).ok(),
        };
        debug!(postgres = %installation.postgres.display(), "resolved postgres installation");
        Ok(installation)
    }

    /// Check that every extension in `extensions` has a control file in the
    /// installation's share directory.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingExtensionSupport`] when `pg_config` is
    /// unavailable or an extension is not installed.
    pub async fn ensure_extensions(&self, extensions: &[String]) -> BootstrapResult<()> {
        if extensions.is_empty() {
            return Ok(());
        }
        let Some(pg_config) = &self.pg_config else {
            return Err(BootstrapError::MissingExtensionSupport {
                extension: None,
                reason: "pg_config_not_found",
            });
        };
        let output = Command::new(pg_config)
            .arg("--sharedir")
            .output()
            .await
            .map_err(|source| BootstrapError::Spawn {
                command: "pg_config",
                source,
            })?;
        if !output.status.success() {
            return Err(BootstrapError::MissingExtensionSupport {
                extension: None,
                reason: "sharedir_unavailable",
            });
        }
        let share = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        missing_extension(&share.join("extension"), extensions).map_or(Ok(()), |extension| {
            Err(BootstrapError::MissingExtensionSupport {
                extension: Some(extension.to_string()),
                reason: "control_file_missing",
            })
        })
    }
}

fn missing_extension<'a>(extension_dir: &Path, extensions: &'a [String]) -> Option<&'a str> {
    extensions
        .iter()
        .find(|name| !extension_dir.join(format!("{name}.control")).is_file())
        .map(String::as_str)
}

/// First `dirs` entry containing `name`.
///
/// # Errors
///
/// Returns [`BootstrapError::MissingBinary`] listing the searched directories.
pub fn resolve_binary(name: &'static str, dirs: &[PathBuf]) -> BootstrapResult<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| BootstrapError::MissingBinary {
            name,
            searched: dirs.to_vec(),
        })
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    // Full server installations first so `initdb` finds its share files.
    dirs.extend([
        PathBuf::from("/opt/homebrew/opt/postgresql@16/bin"),
        PathBuf::from("/usr/local/opt/postgresql@16/bin"),
    ]);
    dirs.extend(
        std::env::var_os("PATH")
            .map_or_else(Vec::new, |paths| std::env::split_paths(&paths).collect()),
    );
    dirs.extend([
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/opt/homebrew/bin"),
    ]);
    dirs.extend(debian_cluster_dirs(Path::new("/usr/lib/postgresql")));
    dirs
}

/// `<root>/<version>/bin` directories, highest version first.
fn debian_cluster_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut versions: Vec<(u32, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let version = entry.file_name().to_str()?.parse::<u32>().ok()?;
            Some((version, entry.path().join("bin")))
        })
        .collect();
    versions.sort_by_key(|(version, _)| Reverse(*version));
    versions.into_iter().map(|(_, dir)| dir).collect()
}
