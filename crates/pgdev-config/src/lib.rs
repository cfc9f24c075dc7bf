#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Declarative configuration for a local `PostgreSQL` instance.
//!
//! Layout: `model.rs` (typed instance configuration), `defaults.rs` (documented
//! default values), `settings.rs` (`postgresql.conf` merging and rendering),
//! `hba.rs` (`pg_hba.conf` compilation), `validate.rs` (pre-flight checks),
//! `loader.rs` (JSON document loading), `render.rs` (generated file set),
//! `env.rs` (invoking-user lookup).

pub mod defaults;
pub mod env;
pub mod error;
pub mod hba;
pub mod loader;
pub mod model;
pub mod render;
pub mod settings;
pub mod validate;

pub use env::current_user;
pub use error::{ConfigError, ConfigResult};
pub use hba::{HbaRule, compile as compile_hba, default_rules};
pub use loader::{load_config, parse_config};
pub use model::{
    DatabaseSpec, DependencyCondition, DependencyEdge, InitialScript, PackageConfig,
    PostgresConfig, ProbeConfig, StartupConfig,
};
pub use render::{RenderedFiles, WrittenFiles};
pub use settings::{SettingValue, Settings, computed_defaults, effective_settings};
pub use validate::validate_databases;
