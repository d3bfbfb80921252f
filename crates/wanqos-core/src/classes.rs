// ── Class tree manager ──
//
// Owns the lifecycle of traffic-class records: root bootstrap, create,
// bound updates, delete, lookups, and the nested tree view served to the
// enforcement agent.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::allocator::ExtIdAllocator;
use crate::error::CoreError;
use crate::model::{
    ClassNode, CreateClassRequest, EntityId, TrafficClass, UpdateClassRequest,
};
use crate::store::{ClassQuery, Store};

/// Class lifecycle operations over a shared store.
pub struct ClassTree<S: Store> {
    store: Arc<S>,
    allocator: Arc<ExtIdAllocator>,
}

impl<S: Store> ClassTree<S> {
    pub fn new(store: Arc<S>, allocator: Arc<ExtIdAllocator>) -> Self {
        Self { store, allocator }
    }

    /// Make sure the root class exists.
    ///
    /// Idempotent and safe to race from several processes: losing the
    /// insert race shows up as a `Conflict`, which is swallowed here and
    /// nowhere else.
    pub fn initialize(&self) -> Result<(), CoreError> {
        let result = self.store.transaction(|tx| {
            if tx.class(&EntityId::root())?.is_some() {
                return Ok(false);
            }
            tx.insert_class(&TrafficClass::root())?;
            Ok(true)
        });

        match result {
            Ok(true) => {
                info!("created root traffic class");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(CoreError::Conflict { identifier, .. }) => {
                debug!(%identifier, "root class created concurrently");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a class under `request.parent` (root when absent or empty).
    ///
    /// The parent is resolved before an id is allocated, so a request for
    /// a missing parent neither consumes an id nor writes anything.
    pub fn create_class(&self, request: CreateClassRequest) -> Result<TrafficClass, CoreError> {
        let direction = request
            .direction
            .ok_or_else(|| CoreError::invalid("direction", "required"))?;

        let parent_id = request
            .parent
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map_or_else(EntityId::root, EntityId::from);

        let class = self.store.transaction(|tx| {
            let parent = tx
                .class(&parent_id)?
                .ok_or_else(|| CoreError::not_found("class", &parent_id))?;

            let class = TrafficClass {
                id: EntityId::generate(),
                class_ext_id: self.allocator.next_ext_id(tx)?,
                direction,
                min_rate: request.min_rate,
                max_rate: request.max_rate,
                parent: Some(parent.id),
                parent_class_ext_id: Some(parent.class_ext_id),
            };
            tx.insert_class(&class)?;
            Ok(class)
        })?;

        info!(
            id = %class.id,
            class_ext_id = class.class_ext_id,
            parent_class_ext_id = ?class.parent_class_ext_id,
            direction = %class.direction,
            "created traffic class"
        );
        Ok(class)
    }

    /// Change the rate bounds of an existing class. Fields left `None` in
    /// the request keep their stored value.
    pub fn update_class(
        &self,
        id: &EntityId,
        request: UpdateClassRequest,
    ) -> Result<TrafficClass, CoreError> {
        if id.is_root() {
            return Err(CoreError::invalid("id", "the root class cannot be modified"));
        }

        let class = self.store.transaction(|tx| {
            let mut class = tx
                .class(id)?
                .ok_or_else(|| CoreError::not_found("class", id))?;
            if let Some(min) = request.min_rate {
                class.min_rate = Some(min);
            }
            if let Some(max) = request.max_rate {
                class.max_rate = Some(max);
            }
            tx.update_class(&class)?;
            Ok(class)
        })?;

        info!(id = %class.id, class_ext_id = class.class_ext_id, "updated traffic class");
        Ok(class)
    }

    /// Delete a class. Deleting an unknown id is a no-op.
    ///
    /// Children are not removed. They keep their `parent` reference but
    /// lose the cached `parent_class_ext_id`, and drop out of the tree.
    pub fn delete_class(&self, id: &EntityId) -> Result<(), CoreError> {
        if id.is_root() {
            return Err(CoreError::invalid("id", "the root class cannot be deleted"));
        }

        let orphaned = self.store.transaction(|tx| {
            if !tx.delete_class(id)? {
                return Ok(None);
            }
            let mut orphaned = 0usize;
            for mut child in tx.query_classes(&ClassQuery::ByParent(id.clone()))? {
                child.parent_class_ext_id = None;
                tx.update_class(&child)?;
                orphaned += 1;
            }
            Ok(Some(orphaned))
        })?;

        match orphaned {
            None => debug!(%id, "delete of unknown class ignored"),
            Some(0) => info!(%id, "deleted traffic class"),
            Some(n) => info!(%id, orphaned = n, "deleted traffic class, children orphaned"),
        }
        Ok(())
    }

    pub fn get_class(&self, id: &EntityId) -> Result<Option<TrafficClass>, CoreError> {
        self.store.read(|tx| Ok(tx.class(id)?))
    }

    /// All classes except the root, in store order.
    pub fn list_classes(&self) -> Result<Vec<TrafficClass>, CoreError> {
        let mut all = self
            .store
            .read(|tx| Ok(tx.query_classes(&ClassQuery::All)?))?;
        all.retain(|c| !c.is_root());
        Ok(all)
    }

    /// Materialize the hierarchy below the root.
    ///
    /// The walk runs inside one read transaction and keeps its own stack,
    /// so chain depth is bounded by memory rather than the thread stack.
    /// Classes whose parent no longer exists are not reachable and do not
    /// appear.
    pub fn get_tree(&self) -> Result<ClassNode, CoreError> {
        let (root, mut children) = self.store.read(|tx| {
            let root = tx
                .class(&EntityId::root())?
                .ok_or_else(|| CoreError::not_found("class", EntityId::root()))?;

            let mut children: HashMap<EntityId, Vec<TrafficClass>> = HashMap::new();
            let mut pending = vec![root.id.clone()];
            while let Some(id) = pending.pop() {
                if children.contains_key(&id) {
                    continue;
                }
                let kids = tx.query_classes(&ClassQuery::ByParent(id.clone()))?;
                pending.extend(kids.iter().map(|c| c.id.clone()));
                children.insert(id, kids);
            }
            Ok((root, children))
        })?;

        let mut stack = vec![Frame::open(root, &mut children)];
        let mut finished = None;
        while let Some(top) = stack.last_mut() {
            if let Some(next) = top.pending.next() {
                let frame = Frame::open(next, &mut children);
                stack.push(frame);
                continue;
            }
            if let Some(Frame { class, done, .. }) = stack.pop() {
                let node = ClassNode {
                    class,
                    child_list: done,
                };
                match stack.last_mut() {
                    Some(parent) => parent.done.push(node),
                    None => finished = Some(node),
                }
            }
        }
        finished.ok_or_else(|| CoreError::not_found("class", EntityId::root()))
    }
}

/// A class whose children are still being assembled.
struct Frame {
    class: TrafficClass,
    pending: std::vec::IntoIter<TrafficClass>,
    done: Vec<ClassNode>,
}

impl Frame {
    fn open(class: TrafficClass, children: &mut HashMap<EntityId, Vec<TrafficClass>>) -> Self {
        let kids = children.remove(&class.id).unwrap_or_default();
        Self {
            class,
            done: Vec::with_capacity(kids.len()),
            pending: kids.into_iter(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Direction, ROOT_CLASS_EXT_ID};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn tree() -> ClassTree<MemoryStore> {
        let tree = ClassTree::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ExtIdAllocator::default()),
        );
        tree.initialize().unwrap();
        tree
    }

    fn both(parent: Option<&TrafficClass>) -> CreateClassRequest {
        CreateClassRequest {
            direction: Some(Direction::Both),
            parent: parent.map(|p| p.id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn initialize_is_idempotent() {
        let tree = tree();
        tree.initialize().unwrap();
        tree.initialize().unwrap();
        let root = tree.get_class(&EntityId::root()).unwrap().unwrap();
        assert_eq!(root, TrafficClass::root());
        assert!(tree.list_classes().unwrap().is_empty());
    }

    #[test]
    fn class_without_parent_hangs_off_root() {
        let tree = tree();
        let a = tree.create_class(both(None)).unwrap();
        assert_eq!(a.class_ext_id, 11);
        assert_eq!(a.parent, Some(EntityId::root()));
        assert_eq!(a.parent_class_ext_id, Some(ROOT_CLASS_EXT_ID));

        let b = tree.create_class(both(Some(&a))).unwrap();
        assert_eq!(b.parent, Some(a.id.clone()));
        assert_eq!(b.parent_class_ext_id, Some(a.class_ext_id));
    }

    #[test]
    fn empty_parent_means_root() {
        let tree = tree();
        let a = tree
            .create_class(CreateClassRequest {
                direction: Some(Direction::Egress),
                parent: Some("  ".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(a.parent, Some(EntityId::root()));
    }

    #[test]
    fn missing_direction_is_invalid() {
        let tree = tree();
        let err = tree.create_class(CreateClassRequest::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { ref field, .. } if field == "direction"));
    }

    #[test]
    fn unknown_parent_is_not_found_and_writes_nothing() {
        let tree = tree();
        let err = tree
            .create_class(CreateClassRequest {
                direction: Some(Direction::Both),
                parent: Some(EntityId::generate().to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }), "got {err:?}");
        assert!(tree.list_classes().unwrap().is_empty());

        // No id was burned by the failed request.
        assert_eq!(tree.create_class(both(None)).unwrap().class_ext_id, 11);
    }

    #[test]
    fn update_changes_only_given_bounds() {
        let tree = tree();
        let a = tree
            .create_class(CreateClassRequest {
                direction: Some(Direction::Ingress),
                min_rate: Some("200kbit".into()),
                max_rate: Some("512kbit".into()),
                parent: None,
            })
            .unwrap();

        let updated = tree
            .update_class(
                &a.id,
                UpdateClassRequest {
                    max_rate: Some("1mbit".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.min_rate.as_deref(), Some("200kbit"));
        assert_eq!(updated.max_rate.as_deref(), Some("1mbit"));
        assert_eq!(updated.class_ext_id, a.class_ext_id);
        assert_eq!(tree.get_class(&a.id).unwrap(), Some(updated));
    }

    #[test]
    fn update_unknown_class_is_not_found() {
        let tree = tree();
        let err = tree
            .update_class(&EntityId::generate(), UpdateClassRequest::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn delete_is_idempotent_and_protects_root() {
        let tree = tree();
        let a = tree.create_class(both(None)).unwrap();
        tree.delete_class(&a.id).unwrap();
        tree.delete_class(&a.id).unwrap();
        assert_eq!(tree.get_class(&a.id).unwrap(), None);

        let err = tree.delete_class(&EntityId::root()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn deleting_a_parent_orphans_children() {
        let tree = tree();
        let a = tree.create_class(both(None)).unwrap();
        let b = tree.create_class(both(Some(&a))).unwrap();

        tree.delete_class(&a.id).unwrap();

        let orphan = tree.get_class(&b.id).unwrap().unwrap();
        assert_eq!(orphan.parent, Some(a.id.clone()));
        assert_eq!(orphan.parent_class_ext_id, None);

        let root = tree.get_tree().unwrap();
        assert_eq!(root.node_count(), 1);
        assert_eq!(tree.list_classes().unwrap(), vec![orphan]);
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let tree = tree();
        let a = tree.create_class(both(None)).unwrap();
        let b = tree.create_class(both(Some(&a))).unwrap();
        let c = tree.create_class(both(Some(&b))).unwrap();
        let d = tree.create_class(both(None)).unwrap();

        let root = tree.get_tree().unwrap();
        assert!(root.class.is_root());
        assert_eq!(root.depth(), 4);
        assert_eq!(root.node_count(), 5);

        let top: Vec<&EntityId> = root.child_list.iter().map(|n| &n.class.id).collect();
        assert_eq!(top, vec![&a.id, &d.id]);
        assert_eq!(root.child_list[0].child_list[0].class, b);
        assert_eq!(root.child_list[0].child_list[0].child_list[0].class, c);
        assert!(root.child_list[1].child_list.is_empty());

        for node in root.iter() {
            for child in &node.child_list {
                assert_eq!(child.class.parent_class_ext_id, Some(node.class.class_ext_id));
            }
        }
    }

    #[test]
    fn deep_chain_builds_on_a_small_stack() {
        const CHAIN: u32 = 5_000;

        let store = Arc::new(MemoryStore::new());
        let tree = ClassTree::new(Arc::clone(&store), Arc::new(ExtIdAllocator::default()));
        tree.initialize().unwrap();
        store
            .transaction(|tx| {
                let mut parent = TrafficClass::root();
                for ext in 11..11 + CHAIN {
                    let class = TrafficClass {
                        id: EntityId::generate(),
                        class_ext_id: ext,
                        direction: Direction::Both,
                        min_rate: None,
                        max_rate: None,
                        parent: Some(parent.id.clone()),
                        parent_class_ext_id: Some(parent.class_ext_id),
                    };
                    tx.insert_class(&class)?;
                    parent = class;
                }
                Ok(())
            })
            .unwrap();

        let tree = Arc::new(tree);
        let worker = Arc::clone(&tree);
        let root = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || worker.get_tree().unwrap())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(root.iter().count(), CHAIN as usize + 1);
        assert_eq!(root.depth(), CHAIN as usize + 1);
    }
}
