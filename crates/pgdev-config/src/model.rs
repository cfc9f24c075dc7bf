//! Typed instance configuration.
//!
//! # Design
//! - One explicit struct with documented defaults replaces option-schema magic.
//! - Derived values (data dir, socket dir, file paths) are computed by methods,
//!   never stored, so overriding one field cannot leave another stale.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defaults::{
    CONFIG_FILE_NAME, DEFAULT_CREATE_DATABASE, DEFAULT_DATA_ROOT, DEFAULT_INITDB_ARGS,
    DEFAULT_LISTEN_ADDRESSES, DEFAULT_PORT, HBA_FILE_NAME, INIT_MARKER_FILE_NAME, MAX_RESTARTS,
    PG_VERSION_FILE_NAME, PROBE_FAILURE_THRESHOLD, PROBE_INITIAL_DELAY_SECS, PROBE_PERIOD_SECS,
    PROBE_SUCCESS_THRESHOLD, PROBE_TIMEOUT_SECS, STARTUP_MAX_ATTEMPTS, STARTUP_RETRY_INTERVAL_MS,
    STARTUP_STEP_TIMEOUT_SECS,
};
use crate::hba::HbaRule;

/// Declarative description of one local `PostgreSQL` instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostgresConfig {
    /// Instance name; also the process namespace and process-name prefix.
    pub name: String,
    /// Location of the `PostgreSQL` installation.
    pub package: PackageConfig,
    /// Extensions that must be available in the installation.
    pub extensions: Vec<String>,
    /// Data directory (`PGDATA`). Defaults to `data/<name>`.
    pub data_dir: Option<PathBuf>,
    /// Unix socket directory. Empty or unset means the data directory.
    pub socket_dir: Option<PathBuf>,
    /// Default for the `listen_addresses` setting.
    pub listen_addresses: String,
    /// Default for the `port` setting.
    pub port: u16,
    /// Superuser created by `initdb`; the invoking user when unset.
    pub superuser: Option<String>,
    /// Create a database named after the invoking user when
    /// `initial_databases` is empty.
    pub create_database: bool,
    /// Extra arguments for `initdb`.
    pub initdb_args: Vec<String>,
    /// Authentication rules appended after the built-in defaults.
    pub hba_conf: Vec<HbaRule>,
    /// Databases created on first start.
    pub initial_databases: Vec<DatabaseSpec>,
    /// SQL run before and after database creation on first start.
    pub initial_script: InitialScript,
    /// Raw `postgresql.conf` overrides; validated into typed values.
    pub settings: BTreeMap<String, Value>,
    /// Extra dependency edges for the init process.
    pub depends_on: BTreeMap<String, DependencyEdge>,
    /// Readiness probe and restart policy for the server process.
    pub probe: ProbeConfig,
    /// Bounded wait budget for the bootstrap.
    pub startup: StartupConfig,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            package: PackageConfig::default(),
            extensions: Vec::new(),
            data_dir: None,
            socket_dir: None,
            listen_addresses: DEFAULT_LISTEN_ADDRESSES.to_string(),
            port: DEFAULT_PORT,
            superuser: None,
            create_database: DEFAULT_CREATE_DATABASE,
            initdb_args: DEFAULT_INITDB_ARGS
                .iter()
                .map(ToString::to_string)
                .collect(),
            hba_conf: Vec::new(),
            initial_databases: Vec::new(),
            initial_script: InitialScript::default(),
            settings: BTreeMap::new(),
            depends_on: BTreeMap::new(),
            probe: ProbeConfig::default(),
            startup: StartupConfig::default(),
        }
    }
}

impl PostgresConfig {
    /// Construct a configuration with defaults for the given instance name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Effective data directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_DATA_ROOT).join(&self.name))
    }

    /// Effective unix socket directory.
    #[must_use]
    pub fn socket_dir(&self) -> PathBuf {
        self.socket_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| self.data_dir())
    }

    /// Port the server listens on. A `port` entry in `settings` replaces
    /// [`Self::port`] in the rendered configuration, so it wins here too.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.settings
            .get("port")
            .and_then(port_override)
            .unwrap_or(self.port)
    }

    /// Directory holding the server's unix socket.
    ///
    /// A `unix_socket_directories` entry in `settings` wins over
    /// [`Self::socket_dir()`]; its first non-empty directory is used, resolved
    /// against the data directory when relative.
    #[must_use]
    pub fn effective_socket_dir(&self) -> PathBuf {
        let overridden = self
            .settings
            .get("unix_socket_directories")
            .and_then(Value::as_str)
            .and_then(|dirs| dirs.split(',').map(str::trim).find(|dir| !dir.is_empty()));
        match overridden {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => self.data_dir().join(dir),
            None => self.socket_dir(),
        }
    }

    /// Path of the rendered `postgresql.conf` inside the data directory.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.data_dir().join(CONFIG_FILE_NAME)
    }

    /// Path of the rendered `pg_hba.conf` inside the data directory.
    #[must_use]
    pub fn hba_file(&self) -> PathBuf {
        self.data_dir().join(HBA_FILE_NAME)
    }

    /// Path of the bootstrap completion marker.
    #[must_use]
    pub fn init_marker(&self) -> PathBuf {
        self.data_dir().join(INIT_MARKER_FILE_NAME)
    }

    /// Whether `initdb` has already populated the data directory.
    #[must_use]
    pub fn cluster_exists(&self) -> bool {
        self.data_dir().join(PG_VERSION_FILE_NAME).is_file()
    }

    /// Name of the short-lived initialisation process.
    #[must_use]
    pub fn init_process_name(&self) -> String {
        format!("{}-init", self.name)
    }

    /// Name of the long-running server process.
    #[must_use]
    pub fn main_process_name(&self) -> String {
        self.name.clone()
    }

    /// Connection URI for `database` over the instance's unix socket.
    #[must_use]
    pub fn connection_uri(&self, database: &str) -> String {
        format!(
            "postgresql://localhost:{}/{database}?host={}",
            self.effective_port(),
            self.effective_socket_dir().display()
        )
    }

    /// Resolve every relative path against `base` (normally the directory of
    /// the configuration document).
    #[must_use]
    pub fn anchored(mut self, base: &Path) -> Self {
        let anchor = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };
        self.data_dir = Some(anchor(self.data_dir()));
        self.socket_dir = self
            .socket_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(anchor);
        self.package.bin_dir = self.package.bin_dir.map(anchor);
        for database in &mut self.initial_databases {
            if let Some(schemas) = database.schemas.take() {
                database.schemas = Some(schemas.into_iter().map(anchor).collect());
            }
        }
        self
    }
}

/// Parse a `port` setting given as a JSON integer or a numeric string.
pub(crate) fn port_override(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(number) => number.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    port.filter(|port| *port != 0)
}

/// Location of the `PostgreSQL` installation providing the server binaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Directory holding `initdb`, `postgres`, `pg_ctl`, `pg_isready`, and
    /// `pg_config`. Binaries are searched on `PATH` when unset.
    pub bin_dir: Option<PathBuf>,
}

/// A database created on first start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSpec {
    /// Database name; unique across the list.
    pub name: String,
    /// Schema sources applied in order. A file is applied whatever its name; a
    /// directory contributes its top-level `*.sql` files in name order and
    /// ignores everything else. `None` creates an empty database.
    #[serde(default)]
    pub schemas: Option<Vec<PathBuf>>,
}

impl DatabaseSpec {
    /// A database with no schema sources.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: None,
        }
    }
}

/// SQL snippets run around database creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialScript {
    /// Run against the maintenance database before any database is created.
    pub before: Option<String>,
    /// Run against the maintenance database after all schemas are applied.
    pub after: Option<String>,
}

/// Condition a dependency must reach before the dependant starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// The dependency exited, regardless of status.
    ProcessCompleted,
    /// The dependency exited with status zero.
    ProcessCompletedSuccessfully,
    /// The dependency passed its readiness probe.
    ProcessHealthy,
    /// The dependency was launched.
    ProcessStarted,
}

impl DependencyCondition {
    /// Wire name understood by the supervisor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProcessCompleted => "process_completed",
            Self::ProcessCompletedSuccessfully => "process_completed_successfully",
            Self::ProcessHealthy => "process_healthy",
            Self::ProcessStarted => "process_started",
        }
    }
}

/// One dependency edge as written in the supervisor document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEdge {
    /// Required state of the dependency.
    pub condition: DependencyCondition,
}

impl From<DependencyCondition> for DependencyEdge {
    fn from(condition: DependencyCondition) -> Self {
        Self { condition }
    }
}

/// Readiness probe timings and restart budget for the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Seconds before the first probe.
    pub initial_delay_seconds: u32,
    /// Seconds between probes.
    pub period_seconds: u32,
    /// Seconds before a probe is abandoned.
    pub timeout_seconds: u32,
    /// Consecutive successes required to become healthy.
    pub success_threshold: u32,
    /// Consecutive failures before becoming unhealthy.
    pub failure_threshold: u32,
    /// Restarts allowed after a failure exit.
    pub max_restarts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            initial_delay_seconds: PROBE_INITIAL_DELAY_SECS,
            period_seconds: PROBE_PERIOD_SECS,
            timeout_seconds: PROBE_TIMEOUT_SECS,
            success_threshold: PROBE_SUCCESS_THRESHOLD,
            failure_threshold: PROBE_FAILURE_THRESHOLD,
            max_restarts: MAX_RESTARTS,
        }
    }
}

/// Bounded wait budget used by the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StartupConfig {
    /// Readiness polls before the server is declared unavailable.
    pub max_attempts: u32,
    /// Milliseconds between readiness polls.
    pub retry_interval_ms: u64,
    /// Upper bound in seconds for one bootstrap step.
    pub step_timeout_secs: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_attempts: STARTUP_MAX_ATTEMPTS,
            retry_interval_ms: STARTUP_RETRY_INTERVAL_MS,
            step_timeout_secs: STARTUP_STEP_TIMEOUT_SECS,
        }
    }
}

impl StartupConfig {
    /// Pause between readiness polls.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Upper bound for one bootstrap step.
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}
