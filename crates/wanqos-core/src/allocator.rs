// ── class_ext_id allocation ──
//
// The high-water mark lives only in memory. It is recovered on first use
// from the largest id the store ever recorded, deleted classes included,
// so a restart skips any value that was handed out before. Gaps are fine,
// reuse is not.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{MAX_CLASS_EXT_ID, ROOT_CLASS_EXT_ID};
use crate::store::Transaction;

/// Lowest high-water mark on an empty store. Ids up to here are reserved.
pub const DEFAULT_EXT_ID_FLOOR: u32 = 10;

/// Hands out unique, strictly increasing `class_ext_id`s.
///
/// The internal lock serializes callers within one process. Across
/// processes, uniqueness rests on each instance seeding from the store
/// and on the store's unique constraint.
#[derive(Debug)]
pub struct ExtIdAllocator {
    floor: u32,
    /// `None` until the first allocation seeds it from the store.
    last: Mutex<Option<u32>>,
}

impl ExtIdAllocator {
    pub fn new(floor: u32) -> Result<Self, CoreError> {
        if floor <= ROOT_CLASS_EXT_ID || floor >= MAX_CLASS_EXT_ID {
            return Err(CoreError::invalid(
                "ext_id_floor",
                format!("must be between {ROOT_CLASS_EXT_ID} and {MAX_CLASS_EXT_ID} (exclusive), got {floor}"),
            ));
        }
        Ok(Self {
            floor,
            last: Mutex::new(None),
        })
    }

    /// Allocate the next id, reading the persisted maximum through `tx`
    /// on first use.
    pub fn next_ext_id(&self, tx: &mut dyn Transaction) -> Result<u32, CoreError> {
        let mut last = self.last.lock();
        let current = match *last {
            Some(value) => value,
            None => {
                let persisted = tx.max_class_ext_id()?;
                let seeded = persisted.map_or(self.floor, |max| max.max(self.floor));
                debug!(?persisted, seeded, "seeded class_ext_id high-water mark");
                seeded
            }
        };

        if current >= MAX_CLASS_EXT_ID {
            // Remember the seed so the store is not re-read on every call.
            *last = Some(current);
            return Err(CoreError::Exhausted {
                limit: MAX_CLASS_EXT_ID,
            });
        }

        let next = current + 1;
        *last = Some(next);
        Ok(next)
    }

    /// The last value handed out (or seeded), if any.
    pub fn high_water_mark(&self) -> Option<u32> {
        *self.last.lock()
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }
}

impl Default for ExtIdAllocator {
    fn default() -> Self {
        Self {
            floor: DEFAULT_EXT_ID_FLOOR,
            last: Mutex::new(None),
        }
    }
}
