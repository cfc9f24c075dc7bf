//! Command handlers grouped by subcommand.

mod plan;
mod render;
mod setup;
mod uri;

pub(crate) use plan::handle_plan;
pub(crate) use render::{RenderSummary, handle_render};
pub(crate) use setup::handle_setup;
pub(crate) use uri::handle_uri;
