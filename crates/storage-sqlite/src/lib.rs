//! Local cache adapter: one serialized snapshot of the record collection in
//! a SQLite key-value table.
//!
//! Read failures (absent or corrupt data) degrade to "no data" and are never
//! fatal; the snapshot is a write-behind mirror, not a source of truth while
//! the remote store is reachable.

use std::path::Path;
use std::sync::Mutex;

use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};

use cycletrack_core::cycles::CycleRecord;
use cycletrack_core::errors::{Error, Result};
use cycletrack_core::sync::LocalCache;

/// Fixed key under which the whole collection is stored.
pub const SNAPSHOT_KEY: &str = "cycle_records";

/// SQLite-backed snapshot store.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) the cache database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::storage(format!("creating {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::init(conn)
    }

    /// In-memory cache, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn read_raw(&self) -> Option<String> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => {
                warn!("cache connection lock poisoned, treating snapshot as absent");
                poisoned.into_inner()
            }
        };
        conn.query_row(
            "SELECT value FROM snapshots WHERE key = ?1",
            [SNAPSHOT_KEY],
            |row| row.get(0),
        )
        .optional()
        .unwrap_or_else(|e| {
            warn!("failed to read snapshot: {}", e);
            None
        })
    }
}

fn storage_err(err: rusqlite::Error) -> Error {
    Error::storage(err.to_string())
}

impl LocalCache for SqliteCache {
    fn read_snapshot(&self) -> Vec<CycleRecord> {
        let Some(raw) = self.read_raw() else {
            debug!("no local snapshot present");
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("local snapshot unreadable, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_snapshot(&self, records: &[CycleRecord]) -> Result<()> {
        let value = serde_json::to_string(records)?;
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::storage("cache connection lock poisoned"))?;
        conn.execute(
            "INSERT INTO snapshots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [SNAPSHOT_KEY, value.as_str()],
        )
        .map_err(storage_err)?;
        Ok(())
    }
}
