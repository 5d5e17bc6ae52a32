use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Number of lock shards. Unrelated identifiers hash to different shards so
/// concurrent request paths rarely contend on the same lock.
const SHARDS: usize = 16;

/// Time-windowed event counter keyed by identifier.
///
/// Each identifier owns an ordered queue of event timestamps. Entries older
/// than the window are pruned before every insert, so a window is bounded by
/// its duration rather than by count. [`Self::sweep`] additionally evicts
/// identifiers whose windows have emptied, bounding the identifier maps
/// under sustained high-cardinality traffic.
pub struct SlidingWindowTracker {
    window: Duration,
    shards: Vec<Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>>,
}

fn shard_index(identifier: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    identifier.hash(&mut hasher);
    (hasher.finish() as usize) % SHARDS
}

fn prune(window: Duration, deque: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
    let cutoff = now - window;
    while let Some(front) = deque.front() {
        if *front < cutoff {
            deque.pop_front();
        } else {
            break;
        }
    }
}

impl SlidingWindowTracker {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.num_seconds().max(0) as u64
    }

    /// Record one event for `identifier` at `now` and return the number of
    /// events remaining in its window.
    ///
    /// Prunes expired entries first, then appends. Timestamps are kept
    /// monotonically non-decreasing: an out-of-order `now` is clamped to the
    /// newest entry already present.
    pub fn record(&self, identifier: &str, now: DateTime<Utc>) -> usize {
        let mut shard = self.shards[shard_index(identifier)].lock().unwrap();
        let deque = shard.entry(identifier.to_string()).or_default();
        prune(self.window, deque, now);
        let ts = match deque.back() {
            Some(back) if *back > now => *back,
            _ => now,
        };
        deque.push_back(ts);
        deque.len()
    }

    /// Number of events in `identifier`'s window at `now`, after pruning,
    /// without recording anything.
    pub fn count(&self, identifier: &str, now: DateTime<Utc>) -> usize {
        let mut shard = self.shards[shard_index(identifier)].lock().unwrap();
        match shard.get_mut(identifier) {
            Some(deque) => {
                prune(self.window, deque, now);
                deque.len()
            }
            None => 0,
        }
    }

    /// Prune every window and evict identifiers whose windows emptied.
    /// Returns the evicted identifiers.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut evicted = Vec::new();
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap();
            shard.retain(|identifier, deque| {
                prune(self.window, deque, now);
                if deque.is_empty() {
                    evicted.push(identifier.clone());
                    false
                } else {
                    true
                }
            });
        }
        evicted
    }

    /// Number of identifiers currently tracked.
    pub fn identifier_count(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }
}
