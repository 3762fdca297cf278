use std::sync::Mutex;

use serde_json::Value;

use super::{Buckets, Store, StoreError};

/// Store that forgets everything on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn put(&self, bucket: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    fn for_each(&self, bucket: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(buckets
            .get(bucket)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(bucket) = buckets.get_mut(bucket) {
            bucket.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.put("routers", "b", json!({"name": "b"})).unwrap();
        store.put("routers", "a", json!({"name": "a"})).unwrap();
        assert_eq!(
            store.get("routers", "a").unwrap(),
            Some(json!({"name": "a"}))
        );
        assert_eq!(store.get("lsps", "a").unwrap(), None);
        let keys: Vec<_> = store
            .for_each("routers")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
        store.delete("routers", "a").unwrap();
        store.delete("routers", "missing").unwrap();
        store.delete("nothing", "a").unwrap();
        assert_eq!(store.for_each("routers").unwrap().len(), 1);
    }
}
