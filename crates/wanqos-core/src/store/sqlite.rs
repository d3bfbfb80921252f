// ── SQLite store ──
//
// Durable backend. One connection per process behind a mutex; several
// processes may share the same file, with writers serialized by SQLite
// itself (IMMEDIATE transactions + busy timeout). Reads use deferred
// transactions so they never wait on a writer under WAL. Uniqueness lives
// in the schema, so a lost race surfaces as a constraint violation.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use super::{ClassQuery, DeviceQuery, ReadOnlyTx, Store, StoreError, Transaction};
use crate::error::CoreError;
use crate::model::{Device, Direction, EntityId, TrafficClass};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS wan_tc_class (
        id                  TEXT PRIMARY KEY,
        class_ext_id        INTEGER NOT NULL UNIQUE,
        direction           TEXT NOT NULL,
        min_rate            TEXT,
        max_rate            TEXT,
        parent              TEXT,
        parent_class_ext_id INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_wan_tc_class_parent
        ON wan_tc_class(parent);

    CREATE TABLE IF NOT EXISTS wan_tc_device (
        id                  TEXT PRIMARY KEY,
        host                TEXT NOT NULL UNIQUE,
        lan_port            TEXT NOT NULL,
        wan_port            TEXT NOT NULL,
        uptime              TEXT NOT NULL,
        heartbeat_timestamp TEXT
    );

    CREATE TABLE IF NOT EXISTS wan_tc_meta (
        key   TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    );
";

const MAX_EXT_ID_KEY: &str = "max_class_ext_id";

const CLASS_COLUMNS: &str =
    "id, class_ext_id, direction, min_rate, max_rate, parent, parent_class_ext_id";

const DEVICE_COLUMNS: &str = "id, host, lan_port, wan_port, uptime, heartbeat_timestamp";

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "opening sqlite store");
        Self::configure(Connection::open(path)?)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // In-memory databases answer "memory" here.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(journal_mode = %mode, "sqlite configured");
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls back.
        let out = f(&mut SqliteTx { conn: &tx })?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    fn read<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, CoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(StoreError::from)?;
        // Nothing to commit; dropping `tx` ends the snapshot.
        f(&mut ReadOnlyTx(&mut SqliteTx { conn: &tx }))
    }
}

struct SqliteTx<'t> {
    conn: &'t Connection,
}

/// Turn constraint violations into `Conflict`, pass everything else through.
fn classify(err: rusqlite::Error, entity: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(code, msg) if code.code == ErrorCode::ConstraintViolation => {
            StoreError::conflict(entity, msg.unwrap_or_else(|| code.to_string()))
        }
        other => StoreError::Sqlite(other),
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

struct ClassRow {
    id: String,
    class_ext_id: u32,
    direction: String,
    min_rate: Option<String>,
    max_rate: Option<String>,
    parent: Option<String>,
    parent_class_ext_id: Option<u32>,
}

impl ClassRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            class_ext_id: row.get(1)?,
            direction: row.get(2)?,
            min_rate: row.get(3)?,
            max_rate: row.get(4)?,
            parent: row.get(5)?,
            parent_class_ext_id: row.get(6)?,
        })
    }
}

impl TryFrom<ClassRow> for TrafficClass {
    type Error = StoreError;

    fn try_from(row: ClassRow) -> Result<Self, Self::Error> {
        let direction: Direction = row.direction.parse().map_err(|_| StoreError::Corrupt {
            entity: "class".into(),
            reason: format!("unknown direction '{}' on {}", row.direction, row.id),
        })?;
        Ok(Self {
            id: EntityId::from(row.id),
            class_ext_id: row.class_ext_id,
            direction,
            min_rate: row.min_rate,
            max_rate: row.max_rate,
            parent: row.parent.map(EntityId::from),
            parent_class_ext_id: row.parent_class_ext_id,
        })
    }
}

struct DeviceRow {
    id: String,
    host: String,
    lan_port: String,
    wan_port: String,
    uptime: DateTime<Utc>,
    heartbeat_timestamp: Option<DateTime<Utc>>,
}

impl DeviceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            host: row.get(1)?,
            lan_port: row.get(2)?,
            wan_port: row.get(3)?,
            uptime: row.get(4)?,
            heartbeat_timestamp: row.get(5)?,
        })
    }
}

impl TryFrom<DeviceRow> for Device {
    type Error = StoreError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| StoreError::Corrupt {
            entity: "device".into(),
            reason: format!("bad id '{}': {e}", row.id),
        })?;
        Ok(Self {
            id,
            host: row.host,
            lan_port: row.lan_port,
            wan_port: row.wan_port,
            uptime: row.uptime,
            heartbeat_timestamp: row.heartbeat_timestamp,
        })
    }
}

impl SqliteTx<'_> {
    fn select_classes(
        &self,
        clause: &str,
        param: Option<String>,
    ) -> Result<Vec<TrafficClass>, StoreError> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM wan_tc_class {clause} ORDER BY rowid");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = match param {
            Some(p) => stmt
                .query_map([p], ClassRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], ClassRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter().map(TrafficClass::try_from).collect()
    }

    fn select_devices(&self, clause: &str, param: Option<String>) -> Result<Vec<Device>, StoreError> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM wan_tc_device {clause} ORDER BY rowid");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = match param {
            Some(p) => stmt
                .query_map([p], DeviceRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], DeviceRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter().map(Device::try_from).collect()
    }
}

impl Transaction for SqliteTx<'_> {
    fn query_classes(&mut self, query: &ClassQuery) -> Result<Vec<TrafficClass>, StoreError> {
        match query {
            ClassQuery::All => self.select_classes("", None),
            ClassQuery::ById(id) => self.select_classes("WHERE id = ?1", Some(id.to_string())),
            ClassQuery::ByParent(parent) => {
                self.select_classes("WHERE parent = ?1", Some(parent.to_string()))
            }
        }
    }

    fn max_class_ext_id(&mut self) -> Result<Option<u32>, StoreError> {
        let live = self
            .conn
            .query_row("SELECT MAX(class_ext_id) FROM wan_tc_class", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .optional()?
            .flatten();
        let recorded = self
            .conn
            .query_row(
                "SELECT value FROM wan_tc_meta WHERE key = ?1",
                [MAX_EXT_ID_KEY],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(live.max(recorded))
    }

    fn insert_class(&mut self, class: &TrafficClass) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO wan_tc_class
                    (id, class_ext_id, direction, min_rate, max_rate, parent, parent_class_ext_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    class.id.to_string(),
                    class.class_ext_id,
                    class.direction.as_ref(),
                    class.min_rate,
                    class.max_rate,
                    class.parent.as_ref().map(ToString::to_string),
                    class.parent_class_ext_id,
                ],
            )
            .map_err(|e| classify(e, "class"))?;
        self.conn.execute(
            "INSERT INTO wan_tc_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            params![MAX_EXT_ID_KEY, class.class_ext_id],
        )?;
        Ok(())
    }

    fn update_class(&mut self, class: &TrafficClass) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE wan_tc_class
                 SET min_rate = ?2, max_rate = ?3, parent = ?4, parent_class_ext_id = ?5
                 WHERE id = ?1",
                params![
                    class.id.to_string(),
                    class.min_rate,
                    class.max_rate,
                    class.parent.as_ref().map(ToString::to_string),
                    class.parent_class_ext_id,
                ],
            )
            .map_err(|e| classify(e, "class"))?;
        Ok(changed > 0)
    }

    fn delete_class(&mut self, id: &EntityId) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM wan_tc_class WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn query_devices(&mut self, query: &DeviceQuery) -> Result<Vec<Device>, StoreError> {
        match query {
            DeviceQuery::All => self.select_devices("", None),
            DeviceQuery::ById(id) => self.select_devices("WHERE id = ?1", Some(id.to_string())),
            DeviceQuery::ByHost(host) => self.select_devices("WHERE host = ?1", Some(host.clone())),
        }
    }

    fn insert_device(&mut self, device: &Device) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO wan_tc_device
                    (id, host, lan_port, wan_port, uptime, heartbeat_timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    device.id.to_string(),
                    device.host,
                    device.lan_port,
                    device.wan_port,
                    device.uptime,
                    device.heartbeat_timestamp,
                ],
            )
            .map_err(|e| classify(e, "device"))?;
        Ok(())
    }

    fn update_device(&mut self, device: &Device) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE wan_tc_device
                 SET host = ?2, lan_port = ?3, wan_port = ?4, uptime = ?5, heartbeat_timestamp = ?6
                 WHERE id = ?1",
                params![
                    device.id.to_string(),
                    device.host,
                    device.lan_port,
                    device.wan_port,
                    device.uptime,
                    device.heartbeat_timestamp,
                ],
            )
            .map_err(|e| classify(e, "device"))?;
        Ok(changed > 0)
    }

    fn delete_device(&mut self, id: &Uuid) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM wan_tc_device WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn child(ext: u32, parent: &TrafficClass) -> TrafficClass {
        TrafficClass {
            id: EntityId::generate(),
            class_ext_id: ext,
            direction: Direction::Egress,
            min_rate: Some("2mbit".into()),
            max_rate: None,
            parent: Some(parent.id.clone()),
            parent_class_ext_id: Some(parent.class_ext_id),
        }
    }

    #[test]
    fn class_round_trips_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = TrafficClass::root();
        let a = child(11, &root);

        let loaded = store
            .transaction(|tx| {
                tx.insert_class(&root)?;
                tx.insert_class(&a)?;
                Ok(tx.class(&a.id)?)
            })
            .unwrap();
        assert_eq!(loaded, Some(a));
    }

    #[test]
    fn duplicate_root_maps_to_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .transaction(|tx| Ok(tx.insert_class(&TrafficClass::root())?))
            .unwrap();
        let err = store
            .transaction(|tx| Ok(tx.insert_class(&TrafficClass::root())?))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }), "got {err:?}");
    }

    #[test]
    fn error_inside_transaction_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = TrafficClass::root();
        let result: Result<(), CoreError> = store.transaction(|tx| {
            tx.insert_class(&root)?;
            tx.insert_class(&child(1, &root))?;
            Ok(())
        });
        assert!(result.is_err());

        let max = store.transaction(|tx| Ok(tx.max_class_ext_id()?)).unwrap();
        assert_eq!(max, None);
    }

    #[test]
    fn device_timestamps_survive_storage() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let device = Device {
            id: Uuid::new_v4(),
            host: "edge-1".into(),
            lan_port: "enp1s0f0".into(),
            wan_port: "enp1s0f1".into(),
            uptime: now,
            heartbeat_timestamp: None,
        };

        let loaded = store
            .transaction(|tx| {
                tx.insert_device(&device)?;
                Ok(tx.device_by_host("edge-1")?)
            })
            .unwrap();
        assert_eq!(loaded, Some(device));
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wanqos.db");
        let root = TrafficClass::root();
        let a = child(42, &root);

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .transaction(|tx| {
                    tx.insert_class(&root)?;
                    tx.insert_class(&a)?;
                    Ok(())
                })
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let max = store.transaction(|tx| Ok(tx.max_class_ext_id()?)).unwrap();
        assert_eq!(max, Some(42));
    }

    #[test]
    fn max_ext_id_survives_delete_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wanqos.db");
        let root = TrafficClass::root();
        let a = child(11, &root);
        let b = child(12, &root);

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .transaction(|tx| {
                    for rec in [&root, &a, &b] {
                        tx.insert_class(rec)?;
                    }
                    Ok(())
                })
                .unwrap();
            store
                .transaction(|tx| Ok(tx.delete_class(&b.id)?))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let max = store.read(|tx| Ok(tx.max_class_ext_id()?)).unwrap();
        assert_eq!(max, Some(12));
    }

    #[test]
    fn read_does_not_wait_for_an_open_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wanqos.db");
        let writer = SqliteStore::open(&path).unwrap();
        let reader = SqliteStore::open(&path).unwrap();
        let root = TrafficClass::root();

        let seen_during_write = writer
            .transaction(|tx| {
                tx.insert_class(&root)?;
                reader.read(|rtx| Ok(rtx.query_classes(&ClassQuery::All)?))
            })
            .unwrap();
        assert!(seen_during_write.is_empty());

        let seen_after = reader
            .read(|rtx| Ok(rtx.query_classes(&ClassQuery::All)?))
            .unwrap();
        assert_eq!(seen_after, vec![root]);
    }

    #[test]
    fn writes_inside_read_are_refused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .read(|tx| Ok(tx.insert_class(&TrafficClass::root())?))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::Store(StoreError::ReadOnly)),
            "got {err:?}"
        );
        let all = store.read(|tx| Ok(tx.query_classes(&ClassQuery::All)?)).unwrap();
        assert!(all.is_empty());
    }
}
