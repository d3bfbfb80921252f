// ── Device liveness tracking ──
//
// Records connect notifications and heartbeats coming from the device
// agents. Each mutation is a single read-then-write transaction keyed
// by host, so a connect racing a heartbeat for the same host cannot
// lose either update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::Device;
use crate::store::{DeviceQuery, Store};

/// Hosts are compared after trimming surrounding whitespace.
fn normalize_host(host: &str) -> Result<&str, CoreError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(CoreError::invalid("host", "must not be empty"));
    }
    Ok(host)
}

/// Source of "now" for timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Device registration and heartbeat bookkeeping.
pub struct DeviceTracker<S: Store> {
    store: Arc<S>,
    clock: Clock,
}

impl<S: Store> DeviceTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<S>, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Handle an agent's connect notification.
    ///
    /// A new host gets a record with both timestamps set to now. A known
    /// host only has its `uptime` refreshed; the ports recorded on first
    /// contact are kept.
    pub fn on_connect(
        &self,
        host: &str,
        lan_port: &str,
        wan_port: &str,
    ) -> Result<Device, CoreError> {
        let host = normalize_host(host)?;
        let now = (self.clock)();

        self.store.transaction(|tx| {
            if let Some(mut device) = tx.device_by_host(host)? {
                debug!(host, "updating uptime for device");
                device.uptime = now;
                tx.update_device(&device)?;
                return Ok(device);
            }

            let device = Device {
                id: Uuid::new_v4(),
                host: host.to_owned(),
                lan_port: lan_port.to_owned(),
                wan_port: wan_port.to_owned(),
                uptime: now,
                heartbeat_timestamp: Some(now),
            };
            tx.insert_device(&device)?;
            info!(host, id = %device.id, lan_port, wan_port, "new device connected");
            Ok(device)
        })
    }

    /// Record a liveness signal. Unknown hosts are rejected without
    /// creating a record: a device must connect before it heartbeats.
    pub fn on_heartbeat(&self, host: &str) -> Result<Device, CoreError> {
        let host = normalize_host(host)?;
        let now = (self.clock)();

        let result = self.store.transaction(|tx| {
            let mut device = tx
                .device_by_host(host)?
                .ok_or_else(|| CoreError::UnknownDevice { host: host.into() })?;
            device.heartbeat_timestamp = Some(now);
            tx.update_device(&device)?;
            Ok(device)
        });

        if let Err(CoreError::UnknownDevice { .. }) = &result {
            warn!(host, "heartbeat from unknown device dropped");
        }
        result
    }

    pub fn get_device(&self, id: &Uuid) -> Result<Option<Device>, CoreError> {
        self.store.read(|tx| Ok(tx.device(id)?))
    }

    pub fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.store.read(|tx| Ok(tx.query_devices(&DeviceQuery::All)?))
    }

    /// Remove a device record. Unlike class deletion, an unknown id is an
    /// error.
    pub fn delete_device(&self, id: &Uuid) -> Result<(), CoreError> {
        self.store.transaction(|tx| {
            if tx.delete_device(id)? {
                Ok(())
            } else {
                Err(CoreError::not_found("device", id))
            }
        })?;
        info!(%id, "deleted device");
        Ok(())
    }
}
