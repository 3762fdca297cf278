use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Shared keyed table used for sessions, LSPs and routers
///
/// Locking stays inside; every accessor copies data out so no caller
/// ever holds the lock across a socket write or a channel send.
#[derive(Debug)]
pub struct Registry<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Registry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.read().await.get(key).cloned()
    }

    /// Insert or replace, returning the previous value
    pub async fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.write().await.insert(key, value)
    }

    pub async fn delete(&self, key: &K) -> Option<V> {
        self.inner.write().await.remove(key)
    }

    /// Visit a snapshot of every entry until `f` returns false
    pub async fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.entries().await.iter() {
            if !f(key, value) {
                break;
            }
        }
    }

    pub async fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn values(&self) -> Vec<V> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry() {
        let registry: Registry<String, u32> = Registry::new();
        assert!(registry.is_empty().await);
        assert_eq!(registry.put("a".to_string(), 1).await, None);
        assert_eq!(registry.put("a".to_string(), 2).await, Some(1));
        registry.put("b".to_string(), 3).await;
        assert_eq!(registry.get(&"a".to_string()).await, Some(2));
        assert_eq!(registry.len().await, 2);

        let mut values = registry.values().await;
        values.sort();
        assert_eq!(values, vec![2, 3]);

        assert_eq!(registry.delete(&"a".to_string()).await, Some(2));
        assert_eq!(registry.get(&"a".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_range_stops_early() {
        let registry: Registry<u32, u32> = Registry::new();
        for i in 0..10 {
            registry.put(i, i).await;
        }
        let mut seen = 0;
        registry
            .range(|_, _| {
                seen += 1;
                seen < 3
            })
            .await;
        assert_eq!(seen, 3);
    }

    #[tokio::test]
    async fn test_range_can_reenter() {
        // The lock is released before visiting, so nested access is fine
        let registry: Registry<u32, u32> = Registry::new();
        registry.put(1, 1).await;
        let clone = registry.clone();
        let mut keys = vec![];
        registry
            .range(|k, _| {
                keys.push(*k);
                true
            })
            .await;
        clone.put(2, 2).await;
        assert_eq!(keys, vec![1]);
        assert_eq!(registry.len().await, 2);
    }
}
