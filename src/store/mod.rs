//! Durable key-value buckets for operator owned records
//!
//! Values are JSON; records are written through before an operation returns.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::error;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Routers, keyed by UUID
pub const ROUTERS: &str = "routers";
/// Controller intended LSPs, keyed by symbolic name
pub const LSPS: &str = "lsps";
/// Every bucket a store holds
pub const BUCKETS: [&str; 2] = [ROUTERS, LSPS];

pub(crate) type Buckets = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    UnknownBucket(String),
    /// A previous writer panicked while holding the store
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Store Error: ")?;
        use StoreError::*;
        match self {
            Sqlite(err) => write!(f, "{}", err),
            Serde(err) => write!(f, "Invalid record: {}", err),
            UnknownBucket(bucket) => write!(f, "No bucket named {}", bucket),
            Poisoned => write!(f, "Store lock poisoned"),
        }
    }
}

impl error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err)
    }
}

pub trait Store: Send + Sync {
    fn put(&self, bucket: &str, key: &str, value: Value) -> Result<(), StoreError>;
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>, StoreError>;
    /// Every (key, value) in the bucket, in key order
    fn for_each(&self, bucket: &str) -> Result<Vec<(String, Value)>, StoreError>;
    /// Deleting a missing key is not an error
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}

pub fn put_record<T: Serialize>(
    store: &dyn Store,
    bucket: &str,
    key: &str,
    record: &T,
) -> Result<(), StoreError> {
    store.put(bucket, key, serde_json::to_value(record)?)
}

pub fn get_record<T: DeserializeOwned>(
    store: &dyn Store,
    bucket: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(bucket, key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn load_records<T: DeserializeOwned>(
    store: &dyn Store,
    bucket: &str,
) -> Result<Vec<T>, StoreError> {
    store
        .for_each(bucket)?
        .into_iter()
        .map(|(_, value)| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}
