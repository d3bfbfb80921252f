//! Command handlers, one module per top-level subcommand.

pub mod agent;
pub mod classes;
pub mod config_cmd;
pub mod devices;
pub mod util;

use std::sync::Arc;

use wanqos_core::{BackendStore, Registry};

use crate::cli::{Command, OutputFormat};
use crate::error::CliError;

/// Settings resolved once from flags and config, shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputFormat,
    pub quiet: bool,
    pub yes: bool,
    /// Heartbeat age beyond which a device is shown as down.
    pub stale_after: chrono::Duration,
}

/// Route a registry-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    registry: Arc<Registry<BackendStore>>,
    ctx: &Context,
) -> Result<(), CliError> {
    match cmd {
        Command::Classes(args) => classes::handle(&registry, args, ctx),
        Command::Devices(args) => devices::handle(&registry, args, ctx),
        Command::Agent(args) => agent::handle(registry, args, ctx).await,
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
