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

//! Process graph for an external supervisor.
//!
//! Every instance contributes two processes: `<name>-init`, which prepares the
//! data directory and exits, and `<name>`, the long-running server that only
//! starts once the init process completed successfully.
//!
//! Layout: `descriptor.rs` (supervisor-facing types), `command.rs` (shell
//! command assembly), `graph.rs` (graph construction and merging).

pub mod command;
pub mod descriptor;
pub mod error;
pub mod graph;

pub use command::{CommandLine, InstanceCommands, shell_quote};
pub use descriptor::{
    Availability, ExecProbe, ProcessDescriptor, ReadinessProbe, RestartPolicy, Shutdown,
};
pub use error::{ProcessError, ProcessResult};
pub use graph::{GraphInputs, ProcessGraph};
