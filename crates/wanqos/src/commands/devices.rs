//! Device command handlers.

use chrono::{DateTime, Utc};
use tabled::Tabled;
use wanqos_core::{BackendStore, Device, Registry};

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "LAN")]
    lan: String,
    #[tabled(rename = "WAN")]
    wan: String,
    #[tabled(rename = "Connected")]
    connected: String,
    #[tabled(rename = "Heartbeat")]
    heartbeat: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

impl DeviceRow {
    fn new(d: &Device, now: DateTime<Utc>, ctx: &Context) -> Self {
        Self {
            id: d.id.to_string(),
            host: d.host.clone(),
            lan: d.lan_port.clone(),
            wan: d.wan_port.clone(),
            connected: util::ago(d.uptime, now),
            heartbeat: d
                .heartbeat_timestamp
                .map_or_else(|| "never".into(), |t| util::ago(t, now)),
            state: state(d, now, ctx),
        }
    }
}

fn state(d: &Device, now: DateTime<Utc>, ctx: &Context) -> &'static str {
    if d.is_stale(now, ctx.stale_after) {
        "down"
    } else {
        "up"
    }
}

fn detail(d: &Device, now: DateTime<Utc>, ctx: &Context) -> String {
    [
        format!("ID:        {}", d.id),
        format!("Host:      {}", d.host),
        format!("LAN port:  {}", d.lan_port),
        format!("WAN port:  {}", d.wan_port),
        format!("Connected: {} ({})", d.uptime.to_rfc3339(), util::ago(d.uptime, now)),
        format!(
            "Heartbeat: {}",
            d.heartbeat_timestamp.map_or_else(
                || "never".into(),
                |t| format!("{} ({})", t.to_rfc3339(), util::ago(t, now))
            )
        ),
        format!("State:     {}", state(d, now, ctx)),
    ]
    .join("\n")
}

fn id_of(d: &Device) -> String {
    d.id.to_string()
}

fn print_device(d: &Device, ctx: &Context) -> Result<(), CliError> {
    let now = Utc::now();
    let out = output::render_single(ctx.output, d, |d| detail(d, now, ctx), id_of)?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    registry: &Registry<BackendStore>,
    args: DevicesArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    let devices = registry.devices();

    match args.command {
        DevicesCommand::Connect {
            host,
            lan_port,
            wan_port,
        } => {
            let device = devices.on_connect(&host, &lan_port, &wan_port)?;
            print_device(&device, ctx)
        }

        DevicesCommand::Heartbeat { host } => {
            let device = devices.on_heartbeat(&host)?;
            print_device(&device, ctx)
        }

        DevicesCommand::List => {
            let all = devices.list_devices()?;
            let now = Utc::now();
            let out =
                output::render_list(ctx.output, &all, |d| DeviceRow::new(d, now, ctx), id_of)?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        DevicesCommand::Get { id } => {
            let uuid = util::parse_device_id(&id)?;
            let device = devices
                .get_device(&uuid)?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: id,
                    list_command: "devices list".into(),
                })?;
            print_device(&device, ctx)
        }

        DevicesCommand::Delete { id } => {
            let uuid = util::parse_device_id(&id)?;
            if !util::confirm("devices delete", &format!("Delete device {id}?"), ctx.yes)? {
                return Ok(());
            }
            devices.delete_device(&uuid)?;
            if !ctx.quiet {
                eprintln!("Device {id} deleted");
            }
            Ok(())
        }
    }
}
