// ── Traffic class domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::entity_id::EntityId;

/// `class_ext_id` of the root class. Fixed, never allocated.
pub const ROOT_CLASS_EXT_ID: u32 = 1;

/// Largest `class_ext_id` a native tc class minor handle can carry.
pub const MAX_CLASS_EXT_ID: u32 = 0xFFFF;

/// Which side of a link a class shapes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    Ingress,
    Egress,
    Both,
}

/// A single rate-limiting class in the tree.
///
/// `min_rate` / `max_rate` are opaque to the registry: the enforcement
/// agent decides what `"512kbit"` means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficClass {
    pub id: EntityId,
    pub class_ext_id: u32,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<String>,
    pub parent: Option<EntityId>,
    /// Cached copy of the parent's `class_ext_id`. Cleared when the parent
    /// is deleted.
    pub parent_class_ext_id: Option<u32>,
}

impl TrafficClass {
    /// The sentinel root record.
    pub fn root() -> Self {
        Self {
            id: EntityId::root(),
            class_ext_id: ROOT_CLASS_EXT_ID,
            direction: Direction::Both,
            min_rate: None,
            max_rate: None,
            parent: None,
            parent_class_ext_id: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }
}

/// A class together with its children, as served to the enforcement agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    #[serde(flatten)]
    pub class: TrafficClass,
    /// Always present, empty for leaves.
    pub child_list: Vec<ClassNode>,
}

impl ClassNode {
    pub fn leaf(class: TrafficClass) -> Self {
        Self {
            class,
            child_list: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Length of the longest root-to-leaf chain, counting nodes.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.child_list.iter().map(|c| (c, level + 1)));
        }
        deepest
    }

    /// Depth-first, pre-order walk of the subtree.
    pub fn iter(&self) -> impl Iterator<Item = &ClassNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.child_list.iter().rev());
            Some(node)
        })
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Input to `ClassTree::create_class`.
///
/// `direction` is optional only so that a structurally incomplete request
/// coming from the translation layer can be rejected with a typed error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateClassRequest {
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<String>,
    /// Parent class id. Absent or empty means the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Input to `ClassTree::update_class`. `None` leaves a bound unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClassRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<String>,
}
