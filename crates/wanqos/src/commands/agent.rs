//! Device agent loop.
//!
//! Plays the enforcement agent's side of the registry: connect once, then
//! on every tick send a heartbeat and pull the class tree. Heartbeat and
//! pull failures are logged and the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wanqos_core::{BackendStore, CoreError, Registry};

use crate::cli::AgentArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

type SharedRegistry = Arc<Registry<BackendStore>>;

/// Run a blocking registry call off the async runtime.
async fn blocking<T, F>(registry: &SharedRegistry, f: F) -> Result<T, CliError>
where
    F: FnOnce(&Registry<BackendStore>) -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || f(&registry))
        .await
        .map_err(|e| CliError::Agent {
            message: e.to_string(),
        })?
        .map_err(CliError::from)
}

pub async fn handle(
    registry: SharedRegistry,
    args: AgentArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    if args.interval == 0 {
        return Err(CliError::validation("interval", "must be at least 1 second"));
    }
    if args.ticks == Some(0) {
        return Err(CliError::validation("ticks", "must be at least 1"));
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let AgentArgs {
        host,
        lan_port,
        wan_port,
        interval,
        ticks,
    } = args;

    let device = blocking(&registry, move |r| {
        r.devices().on_connect(&host, &lan_port, &wan_port)
    })
    .await?;
    info!(host = %device.host, id = %device.id, "agent connected");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut done: u64 = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("agent interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        // The stored host is already normalized.
        let beat_host = device.host.clone();
        match blocking(&registry, move |r| r.devices().on_heartbeat(&beat_host)).await {
            Ok(d) => debug!(host = %d.host, "heartbeat sent"),
            Err(e) => warn!(error = %e, "heartbeat failed, continuing"),
        }

        match blocking(&registry, |r| r.classes().get_tree()).await {
            Ok(tree) => {
                info!(
                    classes = tree.node_count() - 1,
                    depth = tree.depth(),
                    "pulled class tree"
                );
                let out = output::render_tree(ctx.output, &tree)?;
                output::print_output(&out, ctx.quiet);
            }
            Err(e) => warn!(error = %e, "tree pull failed, keeping previous policy"),
        }

        done += 1;
        if ticks.is_some_and(|n| done >= n) {
            break;
        }
    }

    info!(ticks = done, "agent stopped");
    Ok(())
}
