// ── Persistent store adapter ──
//
// The registry talks to storage only through `Store::transaction`. Every
// participant in an operation (allocator read, parent lookup, record
// write) receives the same open `Transaction`, so a nested step joins
// the outer scope instead of opening its own.

mod memory;
mod sqlite;

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Device, EntityId, TrafficClass};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// ── Error ───────────────────────────────────────────────────────────

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {entity}: {detail}")]
    Conflict { entity: String, detail: String },

    #[error("corrupt {entity} record: {reason}")]
    Corrupt { entity: String, reason: String },

    #[error("write attempted inside a read-only transaction")]
    ReadOnly,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn conflict(entity: &str, detail: impl ToString) -> Self {
        Self::Conflict {
            entity: entity.into(),
            detail: detail.to_string(),
        }
    }
}

// ── Predicates ──────────────────────────────────────────────────────

/// Selection predicate for class records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassQuery {
    All,
    ById(EntityId),
    ByParent(EntityId),
}

/// Selection predicate for device records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceQuery {
    All,
    ById(Uuid),
    ByHost(String),
}

// ── Traits ──────────────────────────────────────────────────────────

/// Operations available inside an open transaction.
///
/// Results of `query_*` come back in insertion order. Backends enforce
/// uniqueness of class `id`, class `class_ext_id`, device `id` and
/// device `host`, reporting violations as [`StoreError::Conflict`].
pub trait Transaction {
    fn query_classes(&mut self, query: &ClassQuery) -> Result<Vec<TrafficClass>, StoreError>;

    /// Highest `class_ext_id` ever inserted, root included. Deleting the
    /// class that holds it does not lower the value.
    fn max_class_ext_id(&mut self) -> Result<Option<u32>, StoreError>;

    fn insert_class(&mut self, class: &TrafficClass) -> Result<(), StoreError>;

    /// Rewrite the mutable columns of an existing class. Returns `false`
    /// when no record has that id.
    fn update_class(&mut self, class: &TrafficClass) -> Result<bool, StoreError>;

    fn delete_class(&mut self, id: &EntityId) -> Result<bool, StoreError>;

    fn query_devices(&mut self, query: &DeviceQuery) -> Result<Vec<Device>, StoreError>;

    fn insert_device(&mut self, device: &Device) -> Result<(), StoreError>;

    fn update_device(&mut self, device: &Device) -> Result<bool, StoreError>;

    fn delete_device(&mut self, id: &Uuid) -> Result<bool, StoreError>;

    // ── Point lookups ────────────────────────────────────────────────

    fn class(&mut self, id: &EntityId) -> Result<Option<TrafficClass>, StoreError> {
        Ok(self
            .query_classes(&ClassQuery::ById(id.clone()))?
            .into_iter()
            .next())
    }

    fn device(&mut self, id: &Uuid) -> Result<Option<Device>, StoreError> {
        Ok(self.query_devices(&DeviceQuery::ById(*id))?.into_iter().next())
    }

    fn device_by_host(&mut self, host: &str) -> Result<Option<Device>, StoreError> {
        Ok(self
            .query_devices(&DeviceQuery::ByHost(host.to_owned()))?
            .into_iter()
            .next())
    }
}

/// A transactional store.
///
/// `transaction` runs `f` atomically: `Ok` commits, `Err` rolls back and
/// leaves no partial record behind. `read` runs `f` against a consistent
/// snapshot without taking the write lock; writes inside it fail with
/// [`StoreError::ReadOnly`].
pub trait Store: Send + Sync {
    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>;

    fn read<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>;
}

// ── Read-only view ──────────────────────────────────────────────────

/// Forwards queries to the wrapped transaction and refuses every write.
pub(crate) struct ReadOnlyTx<'a>(pub(crate) &'a mut dyn Transaction);

impl Transaction for ReadOnlyTx<'_> {
    fn query_classes(&mut self, query: &ClassQuery) -> Result<Vec<TrafficClass>, StoreError> {
        self.0.query_classes(query)
    }

    fn max_class_ext_id(&mut self) -> Result<Option<u32>, StoreError> {
        self.0.max_class_ext_id()
    }

    fn insert_class(&mut self, _: &TrafficClass) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn update_class(&mut self, _: &TrafficClass) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn delete_class(&mut self, _: &EntityId) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn query_devices(&mut self, query: &DeviceQuery) -> Result<Vec<Device>, StoreError> {
        self.0.query_devices(query)
    }

    fn insert_device(&mut self, _: &Device) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn update_device(&mut self, _: &Device) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn delete_device(&mut self, _: &Uuid) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }
}

// ── Runtime-selected backend ─────────────────────────────────────────

/// Which backend a registry should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local, lost on exit.
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

/// A store whose backend is chosen from configuration.
pub enum BackendStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl BackendStore {
    pub fn open(backend: &StoreBackend) -> Result<Self, StoreError> {
        match backend {
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new())),
            StoreBackend::Sqlite(path) => Ok(Self::Sqlite(SqliteStore::open(path)?)),
        }
    }
}

impl Store for BackendStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        match self {
            Self::Memory(store) => store.transaction(f),
            Self::Sqlite(store) => store.transaction(f),
        }
    }

    fn read<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        match self {
            Self::Memory(store) => store.read(f),
            Self::Sqlite(store) => store.read(f),
        }
    }
}
