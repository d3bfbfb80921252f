//! Hierarchical traffic-class registry for WAN bandwidth shaping.
//!
//! This crate owns the domain model, storage adapter and business rules
//! behind `wanqos`:
//!
//! - **[`Registry`]**: Facade bundling one [`Store`], one
//!   [`ExtIdAllocator`], the [`ClassTree`] and the [`DeviceTracker`].
//!   [`open_registry()`] picks the backend from a [`RegistryConfig`].
//!
//! - **[`ClassTree`]**: Create, update, delete and look up traffic
//!   classes; bootstraps the fixed root (`id = "root"`, `class_ext_id = 1`)
//!   and materializes the nested [`ClassNode`] view consumed by the
//!   enforcement agent.
//!
//! - **[`ExtIdAllocator`]**: Strictly increasing `class_ext_id`s that
//!   survive restarts by re-reading the highest persisted id.
//!
//! - **[`DeviceTracker`]**: Connect and heartbeat bookkeeping for the
//!   devices that host the classes.
//!
//! - **[`store`]**: The [`Store`] / [`Transaction`] traits plus
//!   [`MemoryStore`] and [`SqliteStore`] backends.

pub mod allocator;
pub mod classes;
pub mod config;
pub mod error;
pub mod liveness;
pub mod model;
pub mod registry;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use allocator::{DEFAULT_EXT_ID_FLOOR, ExtIdAllocator};
pub use classes::ClassTree;
pub use config::{DEFAULT_STALE_AFTER, RegistryConfig};
pub use error::CoreError;
pub use liveness::{Clock, DeviceTracker};
pub use registry::{Registry, open_registry};
pub use store::{
    BackendStore, ClassQuery, DeviceQuery, MemoryStore, SqliteStore, Store, StoreBackend,
    StoreError, Transaction,
};

pub use model::{
    ClassNode, CreateClassRequest, Device, Direction, EntityId, MAX_CLASS_EXT_ID,
    ROOT_CLASS_EXT_ID, ROOT_ID, TrafficClass, UpdateClassRequest,
};
