//! # Bounded LRU Cache
//!
//! [`BoundedCache`] is a concurrency-safe, capacity-bounded key→value store
//! ordered by recency of use. It sits in front of the durable store and only
//! ever holds a subset of it.
//!
//! ## Structure
//!
//! - A `HashMap` from key to node index.
//! - A [`recency::RecencyList`] arena holding the entries, linked from least
//!   recently used (head) to most recently used (tail).
//!
//! Both live behind a single `parking_lot::RwLock`. `get` promotes the entry it
//! reads, so it takes the write lock just like `put`; only `get_all` and `size`
//! share the lock with each other.
//!
//! ## Cancellation
//!
//! `put`, `get`, `get_all` and `size` check their [`RequestContext`] before
//! locking; `get_all` re-checks every [`SCAN_CHECK_INTERVAL`] entries.
//! `contains` and `invalidate` take no context. `invalidate` is the cleanup
//! step after a failed write and must run even once the caller has given up.
//!
//! ## Invariants
//!
//! - `map.len() == order.len()` at all times.
//! - `map.len() <= capacity()` after every public call returns.

mod recency;

use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use parking_lot::RwLock;
use recency::RecencyList;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

/// Default capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// How many entries `get_all` copies between cancellation checks.
pub const SCAN_CHECK_INTERVAL: usize = 1000;

struct Inner<K, V> {
    map: HashMap<K, usize>,
    order: RecencyList<K, Arc<V>>,
}

pub struct BoundedCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    capacity: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Display,
{
    /// Creates an empty cache. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(Inner {
                map: HashMap::with_capacity(capacity),
                order: RecencyList::with_capacity(capacity),
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts or replaces `key`, making it the most recently used entry.
    ///
    /// Replacing an existing key never evicts. Inserting a new key into a full
    /// cache evicts exactly one entry, the least recently used.
    pub fn put(&self, ctx: &RequestContext, key: K, value: Arc<V>) -> Result<()> {
        ctx.check()?;

        let mut inner = self.inner.write();
        if let Some(&idx) = inner.map.get(&key) {
            if let Some(entry) = inner.order.get_mut(idx) {
                entry.value = value;
            }
            inner.order.move_to_back(idx);
            return Ok(());
        }

        let idx = inner.order.push_back(key.clone(), value);
        inner.map.insert(key, idx);

        while inner.order.len() > self.capacity {
            match inner.order.pop_front() {
                Some(evicted) => {
                    trace!(key = %evicted.key, "Evicted");
                    inner.map.remove(&evicted.key);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Looks up `key` and promotes it on a hit. A miss leaves the cache untouched.
    pub fn get<Q>(&self, ctx: &RequestContext, key: &Q) -> Result<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        ctx.check()?;

        let mut inner = self.inner.write();
        let Some(&idx) = inner.map.get(key) else {
            return Err(OrderError::NotFound(key.to_string()));
        };
        inner.order.move_to_back(idx);
        inner
            .order
            .get(idx)
            .map(|entry| Arc::clone(&entry.value))
            .ok_or_else(|| OrderError::Cache(format!("dangling index for {key}")))
    }

    /// Snapshot of every stored value, in no particular order.
    pub fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Arc<V>>> {
        ctx.check()?;

        let inner = self.inner.read();
        let mut values = Vec::with_capacity(inner.order.len());
        for (i, entry) in inner.order.iter().enumerate() {
            if i > 0 && i % SCAN_CHECK_INTERVAL == 0 {
                ctx.check()?;
            }
            values.push(Arc::clone(&entry.value));
        }
        Ok(values)
    }

    /// Current entry count.
    pub fn size(&self, ctx: &RequestContext) -> Result<usize> {
        ctx.check()?;
        Ok(self.inner.read().map.len())
    }

    /// Membership test that does not count as a use.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().map.contains_key(key)
    }

    /// Drops `key` if present. Used to discard an entry known to be stale.
    ///
    /// Takes no context: it runs after the caller's context has already
    /// failed a cache write, and must still take effect.
    pub fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.write();
        match inner.map.remove(key) {
            Some(idx) => inner.order.remove(idx).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> BoundedCache<String, u32> {
        BoundedCache::new(capacity)
    }

    fn size(cache: &BoundedCache<String, u32>) -> usize {
        cache.size(&RequestContext::background()).unwrap()
    }

    fn put(cache: &BoundedCache<String, u32>, key: &str, value: u32) {
        cache
            .put(&RequestContext::background(), key.to_string(), Arc::new(value))
            .unwrap();
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let cache = cache(5);
        for i in 0..50u32 {
            put(&cache, &format!("k{i}"), i);
            assert!(size(&cache) <= cache.capacity());
        }
        assert_eq!(size(&cache), 5);
    }

    #[test]
    fn test_get_promotes_and_lru_is_evicted() {
        let cache = cache(2);
        let ctx = RequestContext::background();
        put(&cache, "a", 1);
        put(&cache, "b", 2);
        assert_eq!(*cache.get(&ctx, "a").unwrap(), 1);
        put(&cache, "c", 3);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(size(&cache), 2);
    }

    #[test]
    fn test_update_in_place_does_not_evict() {
        let cache = cache(3);
        let ctx = RequestContext::background();
        put(&cache, "a", 1);
        put(&cache, "b", 2);
        put(&cache, "c", 3);

        put(&cache, "a", 10);
        assert_eq!(size(&cache), 3);
        assert_eq!(*cache.get(&ctx, "a").unwrap(), 10);
        assert!(cache.contains("b") && cache.contains("c"));

        // The update promoted "a", so "b" goes next.
        put(&cache, "d", 4);
        assert!(!cache.contains("b"));
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_miss_is_not_found_and_changes_nothing() {
        let cache = cache(2);
        let ctx = RequestContext::background();
        put(&cache, "a", 1);
        put(&cache, "b", 2);

        let err = cache.get(&ctx, "zzz").unwrap_err();
        assert!(err.is_not_found());

        // "a" is still the eviction victim.
        put(&cache, "c", 3);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_canceled_context_has_no_side_effect() {
        let cache = cache(2);
        let ctx = RequestContext::background();
        ctx.cancel();

        let err = cache.put(&ctx, "a".to_string(), Arc::new(1)).unwrap_err();
        assert!(matches!(err, OrderError::Canceled));
        assert_eq!(size(&cache), 0);

        put(&cache, "a", 1);
        assert!(matches!(cache.get(&ctx, "a"), Err(OrderError::Canceled)));
        assert!(matches!(cache.get_all(&ctx), Err(OrderError::Canceled)));
        assert!(matches!(cache.size(&ctx), Err(OrderError::Canceled)));
    }

    #[test]
    fn test_get_all_returns_every_value() {
        let cache = cache(10);
        for i in 0..4u32 {
            put(&cache, &format!("k{i}"), i);
        }
        let mut values: Vec<u32> = cache
            .get_all(&RequestContext::background())
            .unwrap()
            .into_iter()
            .map(|v| *v)
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let cache = cache(2);
        put(&cache, "a", 1);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(size(&cache), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = cache(0);
        put(&cache, "a", 1);
        put(&cache, "b", 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(size(&cache), 1);
        assert!(cache.contains("b"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_keeps_bound() {
        let cache = Arc::new(cache(16));
        let mut handles = vec![];
        for t in 0..8u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::background();
                for i in 0..200u32 {
                    let key = format!("k{}", (t * 31 + i) % 40);
                    cache.put(&ctx, key.clone(), Arc::new(i)).unwrap();
                    let _ = cache.get(&ctx, key.as_str());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(size(&cache) <= 16);
        assert_eq!(
            cache.get_all(&RequestContext::background()).unwrap().len(),
            size(&cache)
        );
    }
}
