//! # lrukit
//!
//! Count-bounded LRU cache with eviction callbacks.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to list slot (O(1) lookup)
//! - **LRU List**: arena-backed doubly-linked list ordered by recency (O(1) splice)
//! - **Eviction hook**: optional callback fired for every entry that leaves the cache
//!
//! ```
//! use lrukit::LruCache;
//!
//! let mut cache = LruCache::new(2);
//! cache.put("a", 1);
//! cache.put("b", 2);
//! cache.get("a");
//! cache.put("c", 3);
//!
//! assert!(cache.contains("a"));
//! assert!(!cache.contains("b"));
//! ```
//!
//! The cache is single-owner and does no locking of its own.

#![warn(missing_docs)]

mod lru;
mod stats;

pub use lru::{EvictionCallback, Iter, LruCache};
pub use stats::CacheStats;
