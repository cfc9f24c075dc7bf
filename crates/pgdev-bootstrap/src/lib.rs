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
#![allow(clippy::module_name_repetitions)]

//! First-start initialisation of a local `PostgreSQL` instance.
//!
//! Layout: `plan.rs` (ordered bootstrap plan), `executor.rs` (plan execution
//! over the [`SqlExecutor`] seam), `postgres.rs` (`sqlx` executor over the unix
//! socket), `server.rs` (`initdb` and the temporary socket-only server),
//! `binaries.rs` (installation lookup and extension checks), `bootstrap.rs`
//! (the init-process entry point tying it together).

pub mod binaries;
pub mod bootstrap;
pub mod error;
pub mod executor;
pub mod plan;
pub mod postgres;
pub mod server;

pub use binaries::Installation;
pub use bootstrap::{BootstrapReport, Bootstrapper};
pub use error::{BootstrapError, BootstrapResult};
pub use executor::{PlanOutcome, SqlExecutor, execute_plan};
pub use plan::{BootstrapPlan, BootstrapStep, ScriptPhase, plan};
pub use postgres::PgSqlExecutor;
pub use server::TemporaryServer;
