// ── Registry facade ──
//
// Bundles one store, one allocator, the class tree and the liveness
// tracker. This is what the translation layer holds on to.

use std::sync::Arc;

use tracing::debug;

use crate::allocator::ExtIdAllocator;
use crate::classes::ClassTree;
use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::liveness::{Clock, DeviceTracker};
use crate::store::{BackendStore, Store};

/// The traffic-class registry.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct Registry<S: Store> {
    config: RegistryConfig,
    allocator: Arc<ExtIdAllocator>,
    classes: ClassTree<S>,
    devices: DeviceTracker<S>,
}

impl<S: Store> Registry<S> {
    /// Wrap `store` and make sure the root class exists.
    pub fn open(store: S, config: RegistryConfig) -> Result<Self, CoreError> {
        Self::build(Arc::new(store), config, None)
    }

    /// Like [`open`](Self::open), with an explicit time source for the
    /// liveness tracker.
    pub fn open_with_clock(
        store: S,
        config: RegistryConfig,
        clock: Clock,
    ) -> Result<Self, CoreError> {
        Self::build(Arc::new(store), config, Some(clock))
    }

    fn build(store: Arc<S>, config: RegistryConfig, clock: Option<Clock>) -> Result<Self, CoreError> {
        let allocator = Arc::new(ExtIdAllocator::new(config.ext_id_floor)?);
        let classes = ClassTree::new(Arc::clone(&store), Arc::clone(&allocator));
        let devices = match clock {
            Some(clock) => DeviceTracker::with_clock(Arc::clone(&store), clock),
            None => DeviceTracker::new(Arc::clone(&store)),
        };

        classes.initialize()?;
        debug!(backend = ?config.backend, floor = config.ext_id_floor, "registry ready");

        Ok(Self {
            config,
            allocator,
            classes,
            devices,
        })
    }

    pub fn classes(&self) -> &ClassTree<S> {
        &self.classes
    }

    pub fn devices(&self) -> &DeviceTracker<S> {
        &self.devices
    }

    pub fn allocator(&self) -> &ExtIdAllocator {
        &self.allocator
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

/// Open a registry on the backend named in `config`.
pub fn open_registry(config: RegistryConfig) -> Result<Registry<BackendStore>, CoreError> {
    let store = BackendStore::open(&config.backend)?;
    Registry::open(store, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{CreateClassRequest, Direction};
    use crate::store::{MemoryStore, StoreBackend};
    use chrono::{TimeZone, Utc};

    #[test]
    fn memory_registry_bootstraps_root() {
        let registry = open_registry(RegistryConfig::default()).unwrap();
        let tree = registry.classes().get_tree().unwrap();
        assert!(tree.class.is_root());
        assert!(tree.child_list.is_empty());
        assert_eq!(registry.allocator().high_water_mark(), None);
    }

    #[test]
    fn configured_floor_is_honored() {
        let config = RegistryConfig {
            backend: StoreBackend::Memory,
            ext_id_floor: 100,
            ..RegistryConfig::default()
        };
        let registry = open_registry(config).unwrap();
        let class = registry
            .classes()
            .create_class(CreateClassRequest {
                direction: Some(Direction::Both),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(class.class_ext_id, 101);
    }

    #[test]
    fn injected_clock_stamps_devices() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let registry =
            Registry::open_with_clock(MemoryStore::new(), RegistryConfig::default(), Arc::new(move || at))
                .unwrap();

        let device = registry.devices().on_connect("edge-1", "lan", "wan").unwrap();
        assert_eq!(device.uptime, at);
        assert_eq!(device.heartbeat_timestamp, Some(at));
        assert_eq!(registry.config().ext_id_floor, RegistryConfig::default().ext_id_floor);
    }

    #[test]
    fn bad_floor_is_rejected() {
        let config = RegistryConfig {
            ext_id_floor: 1,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            open_registry(config),
            Err(CoreError::InvalidArgument { .. })
        ));
    }
}
