//! Antibody ledger: bounded, FIFO-evicting map from process key to decayed
//! suspicion load. Shared by the kernel-event bridge (for antibody
//! continuity across events of the same process) and, independently, by
//! the enforcement planner's cooldown map (§5: "one lock per mutable
//! resource").

use std::collections::VecDeque;
use std::sync::Mutex;

use indexmap::IndexMap;

/// Insertion-ordered, size-bounded map. Inserting past capacity evicts the
/// oldest entry first, matching the reference bridge's
/// `next(iter(dict.keys()))` eviction.
pub struct AntibodyLedger {
    inner: Mutex<IndexMap<String, f64>>,
    capacity: usize,
}

impl AntibodyLedger {
    pub fn new(capacity: usize) -> Self {
        AntibodyLedger {
            inner: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Last recorded antibody load for `key`, or `0.0` if unseen.
    pub fn get(&self, key: &str) -> f64 {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.get(key).copied().unwrap_or(0.0)
    }

    /// Record a new antibody load for `key`, evicting the oldest entry if
    /// the ledger is at capacity and `key` is new.
    pub fn set(&self, key: &str, value: f64) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if !guard.contains_key(key) && guard.len() >= self.capacity {
            guard.shift_remove_index(0);
        }
        guard.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-process-key last-action timestamp, used by the enforcement planner
/// to suppress re-firing within a cooldown window. Kept separate from
/// [`AntibodyLedger`] because its eviction policy (none — bounded only by
/// the caller's own process_key cardinality) and key lifetime differ.
pub struct CooldownMap {
    inner: Mutex<std::collections::HashMap<String, i64>>,
}

impl Default for CooldownMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownMap {
    pub fn new() -> Self {
        CooldownMap {
            inner: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Returns true if `key`'s last action was within `cooldown_seconds` of
    /// `now`, without updating the stored timestamp.
    pub fn is_in_cooldown(&self, key: &str, now: i64, cooldown_seconds: i64) -> bool {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match guard.get(key) {
            Some(last) => now - last < cooldown_seconds,
            None => false,
        }
    }

    pub fn record(&self, key: &str, now: i64) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.insert(key.to_string(), now);
    }
}

/// FIFO queue helper retained for callers that want bounded historical
/// traces rather than a single scalar per key (e.g. diagnostics).
pub struct BoundedHistory<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedHistory {
            items: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, item: T) {
        let mut guard = self.items.lock().unwrap_or_else(|p| p.into_inner());
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_eviction_keeps_bounded_size() {
        let ledger = AntibodyLedger::new(2);
        ledger.set("a", 0.1);
        ledger.set("b", 0.2);
        ledger.set("c", 0.3);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get("a"), 0.0);
        assert_eq!(ledger.get("c"), 0.3);
    }

    #[test]
    fn cooldown_suppresses_within_window() {
        let map = CooldownMap::new();
        map.record("proc-1", 100);
        assert!(map.is_in_cooldown("proc-1", 110, 15));
        assert!(!map.is_in_cooldown("proc-1", 200, 15));
    }
}
