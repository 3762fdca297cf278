use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, trace};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{Store, StoreError, BUCKETS};

/// Buckets persisted to SQLite, one `(key, value)` table per bucket
///
/// Values are stored as JSON text. Writes run in a transaction and are
/// committed before the call returns.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        debug!("Opening store at {}", path.as_ref().display());
        Self::init(Connection::open(path)?)
    }

    /// Database that lives as long as the store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        for bucket in BUCKETS.iter() {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    )",
                    bucket
                ),
                [],
            )?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Bucket names become table names, only known ones are accepted
fn table(bucket: &str) -> Result<&'static str, StoreError> {
    BUCKETS
        .iter()
        .find(|b| **b == bucket)
        .copied()
        .ok_or_else(|| StoreError::UnknownBucket(bucket.to_string()))
}

impl Store for SqliteStore {
    fn put(&self, bucket: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let table = table(bucket)?;
        let value = serde_json::to_string(&value)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)", table),
            params![key, value],
        )?;
        tx.commit()?;
        trace!("Stored {}/{}", table, key);
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let table = table(bucket)?;
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", table),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    fn for_each(&self, bucket: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let table = table(bucket)?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT key, value FROM {} ORDER BY key ASC",
            table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut records = vec![];
        for row in rows {
            let (key, value) = row?;
            records.push((key, serde_json::from_str(&value)?));
        }
        Ok(records)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let table = table(bucket)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            &format!("DELETE FROM {} WHERE key = ?1", table),
            params![key],
        )?;
        tx.commit()?;
        trace!("Deleted {}/{} [{} rows]", table, key, deleted);
        Ok(())
    }
}
