//! Applies trace commands to a cache and renders the outcome

use std::fmt;
use std::sync::Arc;

use lrukit::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::command::Command;

type Evicted = Arc<Mutex<Vec<(String, String)>>>;

/// Outcome of one command, printed in redis-cli style
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command succeeded with nothing to report
    Ok,
    /// Lookup result
    Value(Option<String>),
    /// Count result
    Integer(i64),
    /// Entry removed by `OLDEST`
    Entry(Option<(String, String)>),
    /// Entry reported by the eviction callback
    Evicted(String, String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Value(Some(value)) => write!(f, "{}", value),
            Reply::Value(None) | Reply::Entry(None) => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Entry(Some((key, value))) => write!(f, "{} {}", key, value),
            Reply::Evicted(key, value) => write!(f, "EVICTED {} {}", key, value),
        }
    }
}

/// Final cache state, emitted with `--json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Commands applied
    pub commands: usize,
    /// Configured capacity, 0 when unbounded
    pub capacity: usize,
    /// Resident entries at the end of the trace
    pub len: usize,
    /// Lookup hits
    pub hits: u64,
    /// Lookup misses
    pub misses: u64,
    /// New keys inserted
    pub inserts: u64,
    /// Values overwritten
    pub updates: u64,
    /// Entries that left the cache
    pub evictions: u64,
    /// hits / (hits + misses)
    pub hit_ratio: f64,
}

/// Drives an `LruCache<String, String>` from trace commands
pub struct Replayer {
    cache: LruCache<String, String>,
    evicted: Evicted,
    commands: usize,
}

impl Replayer {
    /// Create a replayer over a cache of the given capacity (0 = unbounded)
    pub fn new(capacity: usize) -> Self {
        let evicted: Evicted = Arc::default();
        let sink = Arc::clone(&evicted);
        let cache = LruCache::with_eviction_callback(capacity, move |key: &String, value: &String| {
            sink.lock().push((key.clone(), value.clone()));
        });

        Self {
            cache,
            evicted,
            commands: 0,
        }
    }

    /// Apply one command
    ///
    /// The command's own reply comes last, after any entries the eviction
    /// callback reported while it ran.
    pub fn apply(&mut self, command: Command) -> Vec<Reply> {
        self.commands += 1;

        let reply = match command {
            Command::Put(key, value) => {
                self.cache.put(key, value);
                Reply::Ok
            }
            Command::Get(key) => Reply::Value(self.cache.get(&key).cloned()),
            Command::Remove(key) => Reply::Integer(self.cache.remove(&key).is_some() as i64),
            Command::Oldest => {
                // The callback already reports the removed entry
                let removed = self.cache.remove_oldest();
                self.evicted.lock().clear();
                Reply::Entry(removed)
            }
            Command::Len => Reply::Integer(self.cache.len() as i64),
            Command::Clear => {
                self.cache.clear();
                Reply::Ok
            }
        };

        let mut replies: Vec<Reply> = self
            .evicted
            .lock()
            .drain(..)
            .map(|(key, value)| Reply::Evicted(key, value))
            .collect();
        if !replies.is_empty() {
            debug!(count = replies.len(), "entries left the cache");
        }
        replies.push(reply);
        replies
    }

    /// Snapshot of the cache counters
    pub fn summary(&self) -> Summary {
        let stats = self.cache.stats();
        Summary {
            commands: self.commands,
            capacity: self.cache.capacity(),
            len: self.cache.len(),
            hits: stats.hits(),
            misses: stats.misses(),
            inserts: stats.inserts(),
            updates: stats.updates(),
            evictions: stats.evictions(),
            hit_ratio: stats.hit_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &str, value: &str) -> Command {
        Command::Put(key.to_string(), value.to_string())
    }

    fn get(key: &str) -> Command {
        Command::Get(key.to_string())
    }

    #[test]
    fn test_put_and_get() {
        let mut replayer = Replayer::new(10);

        assert_eq!(replayer.apply(put("a", "1")), vec![Reply::Ok]);
        assert_eq!(
            replayer.apply(get("a")),
            vec![Reply::Value(Some("1".to_string()))]
        );
        assert_eq!(replayer.apply(get("b")), vec![Reply::Value(None)]);
    }

    #[test]
    fn test_eviction_reported_before_reply() {
        let mut replayer = Replayer::new(2);

        replayer.apply(put("a", "1"));
        replayer.apply(put("b", "2"));
        replayer.apply(get("a"));
        let replies = replayer.apply(put("c", "3"));

        assert_eq!(
            replies,
            vec![Reply::Evicted("b".to_string(), "2".to_string()), Reply::Ok]
        );
    }

    #[test]
    fn test_remove_and_oldest() {
        let mut replayer = Replayer::new(0);

        replayer.apply(put("a", "1"));
        replayer.apply(put("b", "2"));

        assert_eq!(
            replayer.apply(Command::Remove("a".to_string())),
            vec![
                Reply::Evicted("a".to_string(), "1".to_string()),
                Reply::Integer(1)
            ]
        );
        assert_eq!(
            replayer.apply(Command::Remove("a".to_string())),
            vec![Reply::Integer(0)]
        );
        assert_eq!(
            replayer.apply(Command::Oldest),
            vec![Reply::Entry(Some(("b".to_string(), "2".to_string())))]
        );
        assert_eq!(replayer.apply(Command::Oldest), vec![Reply::Entry(None)]);
    }

    #[test]
    fn test_clear_reports_every_entry() {
        let mut replayer = Replayer::new(0);

        replayer.apply(put("a", "1"));
        replayer.apply(put("b", "2"));
        let replies = replayer.apply(Command::Clear);

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[2], Reply::Ok);
        assert_eq!(replayer.apply(Command::Len), vec![Reply::Integer(0)]);
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::Ok.to_string(), "OK");
        assert_eq!(Reply::Value(None).to_string(), "(nil)");
        assert_eq!(Reply::Integer(3).to_string(), "(integer) 3");
        assert_eq!(
            Reply::Evicted("k".to_string(), "v".to_string()).to_string(),
            "EVICTED k v"
        );
    }

    #[test]
    fn test_summary() {
        let mut replayer = Replayer::new(1);

        replayer.apply(put("a", "1"));
        replayer.apply(put("a", "2"));
        replayer.apply(put("b", "3"));
        replayer.apply(get("a"));
        replayer.apply(get("b"));

        let summary = replayer.summary();
        assert_eq!(summary.commands, 5);
        assert_eq!(summary.capacity, 1);
        assert_eq!(summary.len, 1);
        assert_eq!(summary.inserts, 2);
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.evictions, 1);
        assert_eq!(summary.hit_ratio, 0.5);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
    }
}
