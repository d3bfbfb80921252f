// ── Domain model ──
//
// Plain records handed to API consumers. Nothing here knows about
// storage.

pub mod device;
pub mod entity_id;
pub mod traffic_class;

pub use device::Device;
pub use entity_id::{EntityId, ROOT_ID};
pub use traffic_class::{
    ClassNode, CreateClassRequest, Direction, MAX_CLASS_EXT_ID, ROOT_CLASS_EXT_ID, TrafficClass,
    UpdateClassRequest,
};
