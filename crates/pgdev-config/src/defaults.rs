//! Default values for instance configuration.
//!
//! # Design
//! - Centralize defaults so the config model, renderers, and process graph agree.
//! - Keep timing defaults explicit; the readiness probe values mirror what the
//!   supervisor expects for a freshly started server.

/// Default TCP port for the `port` setting.
pub const DEFAULT_PORT: u16 = 5432;
/// Default value for the `listen_addresses` setting.
pub const DEFAULT_LISTEN_ADDRESSES: &str = "127.0.0.1";
/// Directory, relative to the configuration file, holding `<name>` data
/// directories when `data_dir` is unset.
pub const DEFAULT_DATA_ROOT: &str = "data";
/// Arguments passed to `initdb` when the configuration does not override them.
pub const DEFAULT_INITDB_ARGS: &[&str] = &["--locale=C", "--encoding=UTF8"];
/// Whether a database named after the invoking user is created by default.
pub const DEFAULT_CREATE_DATABASE: bool = true;

/// File name of the rendered server configuration inside the data directory.
pub const CONFIG_FILE_NAME: &str = "postgresql.conf";
/// File name of the rendered authentication rules inside the data directory.
pub const HBA_FILE_NAME: &str = "pg_hba.conf";
/// Marker written into the data directory after a successful bootstrap.
pub const INIT_MARKER_FILE_NAME: &str = ".pgdev-initialized";
/// File written by `initdb`; its presence means the cluster exists.
pub const PG_VERSION_FILE_NAME: &str = "PG_VERSION";
/// Maintenance database used for administrative connections.
pub const MAINTENANCE_DATABASE: &str = "postgres";
/// Database used by the readiness probe.
pub const PROBE_DATABASE: &str = "template1";

/// Seconds before the first readiness probe.
pub const PROBE_INITIAL_DELAY_SECS: u32 = 2;
/// Seconds between readiness probes.
pub const PROBE_PERIOD_SECS: u32 = 10;
/// Seconds before a single readiness probe is abandoned.
pub const PROBE_TIMEOUT_SECS: u32 = 4;
/// Consecutive successes required to mark the server healthy.
pub const PROBE_SUCCESS_THRESHOLD: u32 = 1;
/// Consecutive failures before the server is marked unhealthy.
pub const PROBE_FAILURE_THRESHOLD: u32 = 5;
/// Restart budget for the main server process.
pub const MAX_RESTARTS: u32 = 5;
/// Signal used to stop the main server (`SIGINT`, fast shutdown).
pub const SHUTDOWN_SIGNAL: i32 = 2;

/// Readiness polls attempted by the bootstrap before giving up.
pub const STARTUP_MAX_ATTEMPTS: u32 = 30;
/// Milliseconds between bootstrap readiness polls.
pub const STARTUP_RETRY_INTERVAL_MS: u64 = 500;
/// Upper bound in seconds for a single bootstrap step.
pub const STARTUP_STEP_TIMEOUT_SECS: u64 = 300;
