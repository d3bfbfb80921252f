// ── Runtime registry configuration ──
//
// Describes *how* to open a registry. Never touches configuration files;
// the config crate and the CLI build one of these and hand it in.

use std::time::Duration;

use crate::allocator::DEFAULT_EXT_ID_FLOOR;
use crate::store::StoreBackend;

/// Default age after which a device without a heartbeat is shown as down.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Where class and device records live.
    pub backend: StoreBackend,
    /// High-water mark used when the store holds no classes yet.
    pub ext_id_floor: u32,
    /// Heartbeat age beyond which consumers should consider a device down.
    /// The registry itself only records timestamps.
    pub stale_after: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ext_id_floor: DEFAULT_EXT_ID_FLOOR,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}
