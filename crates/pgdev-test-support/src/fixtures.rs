//! Test fixtures and environment helpers.

use std::net::TcpListener;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable naming a directory with `PostgreSQL` server binaries.
pub const BIN_DIR_ENV: &str = "PGDEV_TEST_PG_BIN";

/// Directory holding `initdb` and friends, if one can be found.
///
/// `PGDEV_TEST_PG_BIN` wins; otherwise the first `PATH` entry containing
/// `initdb` is used.
#[must_use]
pub fn postgres_bin_dir() -> Option<PathBuf> {
    bin_dir_with(
        std::env::var_os(BIN_DIR_ENV).map(PathBuf::from),
        std::env::var_os("PATH")
            .map_or_else(Vec::new, |paths| std::env::split_paths(&paths).collect()),
    )
}

/// Returns `true` if server binaries are available for integration tests.
#[must_use]
pub fn postgres_available() -> bool {
    postgres_bin_dir().is_some()
}

fn bin_dir_with(explicit: Option<PathBuf>, path: Vec<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return has_server_binaries(&dir).then_some(dir);
    }
    path.into_iter().find(|dir| has_server_binaries(dir))
}

fn has_server_binaries(dir: &Path) -> bool {
    ["initdb", "postgres", "pg_ctl", "pg_isready"]
        .iter()
        .all(|name| dir.join(name).is_file())
}

/// Reserve a free TCP port on loopback.
///
/// # Errors
///
/// Returns an error when no port can be bound.
pub fn reserve_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    let port = listener
        .local_addr()
        .context("failed to read listener address")?
        .port();
    drop(listener);
    Ok(port)
}
