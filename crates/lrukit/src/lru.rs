//! LRU (Least Recently Used) cache implementation
//!
//! Entries live in an arena of slots linked into a doubly-linked recency
//! list (head = most recently used, tail = least recently used). A hash map
//! from key to slot index gives O(1) lookup, and splicing a slot to the head
//! is O(1) pointer-free index juggling.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use ahash::RandomState;
use tracing::{debug, trace};

use crate::stats::CacheStats;

/// Callback invoked with every entry that leaves the cache
pub type EvictionCallback<K, V> = Box<dyn FnMut(&K, &V) + Send>;

/// Node in the LRU doubly-linked list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache bounded by entry count
///
/// A capacity of `0` means unbounded: nothing is evicted automatically and
/// trimming is left to the caller through [`remove_oldest`](Self::remove_oldest).
///
/// The cache does no locking. Share it between threads behind a mutex.
///
/// # Eviction callback
///
/// An optional callback receives `(key, value)` synchronously for every entry
/// that leaves the cache: capacity eviction in [`put`](Self::put),
/// [`remove`](Self::remove), [`remove_oldest`](Self::remove_oldest),
/// [`set_capacity`](Self::set_capacity) and [`clear`](Self::clear). Overwriting
/// a resident key does not fire it, and neither does dropping the cache.
///
/// The callback must not reach back into the cache that is calling it. The
/// borrow checker rules that out for a plain `&mut` cache; a cache shared
/// through `RefCell` or a lock will panic or deadlock instead.
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
    on_evicted: Option<EvictionCallback<K, V>>,
    stats: CacheStats,
}

impl<K, V> Default for LruCache<K, V> {
    /// An empty, unbounded cache. Nothing is allocated until the first insert.
    fn default() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity: 0,
            on_evicted: None,
            stats: CacheStats::default(),
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .field("has_eviction_callback", &self.on_evicted.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq,
{
    /// Create a new LRU cache holding at most `capacity` entries (`0` = unbounded)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Create a cache that never evicts on its own
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a cache that reports every departing entry to `callback`
    pub fn with_eviction_callback<F>(capacity: usize, callback: F) -> Self
    where
        F: FnMut(&K, &V) + Send + 'static,
    {
        let mut cache = Self::new(capacity);
        cache.set_eviction_callback(callback);
        cache
    }

    /// Install or replace the eviction callback
    pub fn set_eviction_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&K, &V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(callback));
    }

    /// Remove the eviction callback, returning it if one was set
    pub fn take_eviction_callback(&mut self) -> Option<EvictionCallback<K, V>> {
        self.on_evicted.take()
    }

    /// Get a value from the cache, marking it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.touch(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Mutable variant of [`get`](Self::get); also marks the entry most recently used
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.touch(key)?;
        self.nodes[idx].as_mut().map(|node| &mut node.value)
    }

    /// Look at a value without changing recency or stats
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Check residency without changing recency or stats
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// The entry [`remove_oldest`](Self::remove_oldest) would evict next
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        let idx = self.tail?;
        self.nodes[idx].as_ref().map(|node| (&node.key, &node.value))
    }

    /// Remove a key from the cache
    ///
    /// Fires the eviction callback and returns the value if the key was
    /// resident; otherwise does nothing.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        let node = self.detach(idx)?;
        self.notify_evicted(&node.key, &node.value);
        Some(node.value)
    }

    /// Remove the least recently used entry, if any
    ///
    /// Every automatic eviction goes through here.
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        let tail_idx = self.tail?;
        let node = self.detach(tail_idx)?;
        self.map.remove(&node.key);
        self.notify_evicted(&node.key, &node.value);
        Some((node.key, node.value))
    }

    /// Change the entry limit (`0` = unbounded)
    ///
    /// Shrinking below the current size evicts least recently used entries
    /// until the cache fits.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;

        let mut evicted = 0usize;
        if capacity != 0 {
            while self.map.len() > capacity && self.remove_oldest().is_some() {
                evicted += 1;
            }
        }
        debug!(capacity, evicted, "cache capacity changed");
    }

    /// Drop every entry, reporting each one to the eviction callback
    ///
    /// Entries are reported from least to most recently used. Afterwards the
    /// cache holds no allocations, just like a fresh [`LruCache::new`].
    /// Capacity, callback and stats are kept.
    pub fn clear(&mut self) {
        let mut nodes = std::mem::take(&mut self.nodes);
        let mut cursor = self.tail;
        let cleared = self.map.len();

        self.map = HashMap::with_hasher(RandomState::new());
        self.free_list = Vec::new();
        self.head = None;
        self.tail = None;

        while let Some(idx) = cursor {
            let Some(node) = nodes[idx].take() else {
                break;
            };
            cursor = node.prev;
            self.notify_evicted(&node.key, &node.value);
        }
        debug!(entries = cleared, "cache cleared");
    }

    fn touch<Q>(&mut self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key).copied() {
            Some(idx) => {
                self.stats.record_hit();
                self.move_to_front(idx);
                Some(idx)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Insert a key-value pair into the cache
    ///
    /// A resident key gets its value overwritten and becomes most recently
    /// used; the callback is not invoked. A new key goes to the front, and if
    /// that pushes the cache over capacity the least recently used entry is
    /// evicted. At most one entry is evicted per call.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(idx) = self.map.get(&key).copied() {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
            }
            self.move_to_front(idx);
            self.stats.record_update();
            return;
        }

        let idx = self.alloc_node(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.attach_front(idx);
        self.map.insert(key, idx);
        self.stats.record_insert();

        if self.capacity != 0 && self.map.len() > self.capacity {
            trace!(capacity = self.capacity, "evicting least recently used entry");
            self.remove_oldest();
        }
    }
}

impl<K, V> LruCache<K, V> {
    /// Get the current size of the cache
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries, `0` when unbounded
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the cache never evicts on its own
    pub fn is_unbounded(&self) -> bool {
        self.capacity == 0
    }

    /// Usage counters since creation or the last [`reset_stats`](Self::reset_stats)
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Zero the usage counters
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Iterate entries from most to least recently used without touching them
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head,
            remaining: self.map.len(),
        }
    }

    fn notify_evicted(&mut self, key: &K, value: &V) {
        self.stats.record_eviction();
        if let Some(callback) = self.on_evicted.as_mut() {
            callback(key, value);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return; // Already at front
        }

        self.unlink(idx);
        self.attach_front(idx);
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = old_head;
        }

        if let Some(head_idx) = old_head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = if let Some(node) = &self.nodes[idx] {
            (node.prev, node.next)
        } else {
            return;
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    /// Unlink a slot and hand its node back, recycling the slot
    fn detach(&mut self, idx: usize) -> Option<Node<K, V>> {
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.free_list.push(idx);
        Some(node)
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }
}

/// Iterator over cache entries, most recently used first
pub struct Iter<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let nodes: &'a [Option<Node<K, V>>] = self.nodes;
        let node = nodes[self.cursor?].as_ref()?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
