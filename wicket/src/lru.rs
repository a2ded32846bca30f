///! Least-recently-used cache backing the default DNS resolver.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Capacity-bounded LRU map. Reads and writes are O(1); eviction scans for
/// the stalest entry, which is fine at resolver-cache sizes.
pub struct Lru<K, V> {
    map: HashMap<K, Entry<V>>,
    capacity: usize,
    tick: u64,
}

struct Entry<V> {
    value: V,
    used: u64,
}

impl<K, V> Lru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "invalid cache size");
        Self {
            map: HashMap::with_capacity(capacity),
            capacity,
            tick: 0,
        }
    }

    /// Insert or refresh a key/value pair, evicting the least recently used
    /// entry when the cache is full.
    pub fn add(&mut self, key: K, value: V) {
        self.tick += 1;
        if !self.map.contains_key(&key) && self.map.len() == self.capacity {
            self.evict();
        }
        let used = self.tick;
        self.map.insert(key, Entry { value, used });
    }

    /// Fetch a value, marking the entry as recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.map.get_mut(key)?;
        entry.used = tick;
        Some(entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn evict(&mut self) {
        let stalest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.used)
            .map(|(key, _)| key.clone());
        if let Some(key) = stalest {
            self.map.remove(&key);
        }
    }
}

/// Concurrent-safe wrapper around [`Lru`].
pub struct SyncLru<K, V> {
    inner: Mutex<Lru<K, V>>,
}

impl<K, V> SyncLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
        }
    }

    pub fn add(&self, key: K, value: V) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.add(key, value);
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().ok()?.get(key)
    }
}
