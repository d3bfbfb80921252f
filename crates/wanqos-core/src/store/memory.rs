// ── In-memory store ──
//
// Insertion-ordered tables behind a single mutex. A write transaction
// works on a scratch copy of the tables and swaps it in only on success,
// so a failed operation never leaves a half-written record. Reads borrow
// the committed tables directly.

use indexmap::IndexMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{ClassQuery, DeviceQuery, ReadOnlyTx, Store, StoreError, Transaction};
use crate::error::CoreError;
use crate::model::{Device, EntityId, TrafficClass};

#[derive(Debug, Clone, Default)]
struct Tables {
    classes: IndexMap<EntityId, TrafficClass>,
    devices: IndexMap<Uuid, Device>,
    /// Highest `class_ext_id` ever inserted. Survives deletes.
    max_ext_id: Option<u32>,
}

/// Process-local store. Every transaction is serialized on one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        let mut committed = self.tables.lock();
        let mut scratch = committed.clone();
        let out = f(&mut MemoryTx {
            tables: &mut scratch,
        })?;
        *committed = scratch;
        Ok(out)
    }

    fn read<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        let mut committed = self.tables.lock();
        let mut view = MemoryTx {
            tables: &mut *committed,
        };
        f(&mut ReadOnlyTx(&mut view))
    }
}

struct MemoryTx<'t> {
    tables: &'t mut Tables,
}

impl Transaction for MemoryTx<'_> {
    fn query_classes(&mut self, query: &ClassQuery) -> Result<Vec<TrafficClass>, StoreError> {
        let classes = &self.tables.classes;
        Ok(match query {
            ClassQuery::All => classes.values().cloned().collect(),
            ClassQuery::ById(id) => classes.get(id).cloned().into_iter().collect(),
            ClassQuery::ByParent(parent) => classes
                .values()
                .filter(|c| c.parent.as_ref() == Some(parent))
                .cloned()
                .collect(),
        })
    }

    fn max_class_ext_id(&mut self) -> Result<Option<u32>, StoreError> {
        let live = self.tables.classes.values().map(|c| c.class_ext_id).max();
        Ok(live.max(self.tables.max_ext_id))
    }

    fn insert_class(&mut self, class: &TrafficClass) -> Result<(), StoreError> {
        let classes = &mut self.tables.classes;
        if classes.contains_key(&class.id) {
            return Err(StoreError::conflict("class", format!("id {}", class.id)));
        }
        if classes
            .values()
            .any(|c| c.class_ext_id == class.class_ext_id)
        {
            return Err(StoreError::conflict(
                "class",
                format!("class_ext_id {}", class.class_ext_id),
            ));
        }
        classes.insert(class.id.clone(), class.clone());
        self.tables.max_ext_id = self.tables.max_ext_id.max(Some(class.class_ext_id));
        Ok(())
    }

    fn update_class(&mut self, class: &TrafficClass) -> Result<bool, StoreError> {
        let Some(existing) = self.tables.classes.get_mut(&class.id) else {
            return Ok(false);
        };
        // id, class_ext_id and direction are fixed at creation.
        existing.min_rate.clone_from(&class.min_rate);
        existing.max_rate.clone_from(&class.max_rate);
        existing.parent.clone_from(&class.parent);
        existing.parent_class_ext_id = class.parent_class_ext_id;
        Ok(true)
    }

    fn delete_class(&mut self, id: &EntityId) -> Result<bool, StoreError> {
        Ok(self.tables.classes.shift_remove(id).is_some())
    }

    fn query_devices(&mut self, query: &DeviceQuery) -> Result<Vec<Device>, StoreError> {
        let devices = &self.tables.devices;
        Ok(match query {
            DeviceQuery::All => devices.values().cloned().collect(),
            DeviceQuery::ById(id) => devices.get(id).cloned().into_iter().collect(),
            DeviceQuery::ByHost(host) => devices
                .values()
                .filter(|d| &d.host == host)
                .cloned()
                .collect(),
        })
    }

    fn insert_device(&mut self, device: &Device) -> Result<(), StoreError> {
        let devices = &mut self.tables.devices;
        if devices.contains_key(&device.id) {
            return Err(StoreError::conflict("device", format!("id {}", device.id)));
        }
        if devices.values().any(|d| d.host == device.host) {
            return Err(StoreError::conflict(
                "device",
                format!("host {}", device.host),
            ));
        }
        devices.insert(device.id, device.clone());
        Ok(())
    }

    fn update_device(&mut self, device: &Device) -> Result<bool, StoreError> {
        let devices = &mut self.tables.devices;
        if devices
            .values()
            .any(|d| d.host == device.host && d.id != device.id)
        {
            return Err(StoreError::conflict(
                "device",
                format!("host {}", device.host),
            ));
        }
        let Some(existing) = devices.get_mut(&device.id) else {
            return Ok(false);
        };
        *existing = device.clone();
        Ok(true)
    }

    fn delete_device(&mut self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.devices.shift_remove(id).is_some())
    }
}
