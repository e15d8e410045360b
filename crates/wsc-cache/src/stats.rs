use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;

use crate::handle::WorkspaceState;

/// Why an entry left the cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Made room for a new entry.
    Capacity,
    /// Unused for longer than the idle timeout.
    Idle,
    /// Process memory exceeded the configured budget.
    MemoryPressure,
    /// Files under the workspace changed.
    Invalidated,
    /// Explicit `remove`.
    Removed,
    /// Explicit `clear_all` or shutdown.
    Cleared,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvictionReason::Capacity => "capacity",
            EvictionReason::Idle => "idle",
            EvictionReason::MemoryPressure => "memory pressure",
            EvictionReason::Invalidated => "invalidated",
            EvictionReason::Removed => "removed",
            EvictionReason::Cleared => "cleared",
        })
    }
}

/// Cumulative evictions per reason since the cache was created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EvictionCounts {
    pub capacity: u64,
    pub idle: u64,
    pub memory_pressure: u64,
    pub invalidated: u64,
    pub removed: u64,
    pub cleared: u64,
}

impl EvictionCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.capacity
            + self.idle
            + self.memory_pressure
            + self.invalidated
            + self.removed
            + self.cleared
    }
}

#[derive(Debug, Default)]
pub(crate) struct EvictionCounters {
    capacity: AtomicU64,
    idle: AtomicU64,
    memory_pressure: AtomicU64,
    invalidated: AtomicU64,
    removed: AtomicU64,
    cleared: AtomicU64,
}

impl EvictionCounters {
    pub(crate) fn record(&self, reason: EvictionReason) {
        let counter = match reason {
            EvictionReason::Capacity => &self.capacity,
            EvictionReason::Idle => &self.idle,
            EvictionReason::MemoryPressure => &self.memory_pressure,
            EvictionReason::Invalidated => &self.invalidated,
            EvictionReason::Removed => &self.removed,
            EvictionReason::Cleared => &self.cleared,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EvictionCounts {
        EvictionCounts {
            capacity: self.capacity.load(Ordering::Relaxed),
            idle: self.idle.load(Ordering::Relaxed),
            memory_pressure: self.memory_pressure.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cache, suitable for health endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub total_entries: usize,
    pub max_entries: usize,
    /// Loads currently in flight.
    pub loading: usize,
    pub per_state: BTreeMap<WorkspaceState, usize>,
    pub approx_memory_mb: Option<u64>,
    pub watched_roots: usize,
    pub evictions: EvictionCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_reason() {
        let counters = EvictionCounters::default();
        counters.record(EvictionReason::Capacity);
        counters.record(EvictionReason::Capacity);
        counters.record(EvictionReason::Idle);

        let counts = counters.snapshot();
        assert_eq!(counts.capacity, 2);
        assert_eq!(counts.idle, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn stats_serialize_with_state_names() {
        let stats = CacheStats {
            enabled: true,
            total_entries: 1,
            max_entries: 5,
            loading: 0,
            per_state: BTreeMap::from([(WorkspaceState::Ready, 1)]),
            approx_memory_mb: Some(512),
            watched_roots: 1,
            evictions: EvictionCounts::default(),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["per_state"]["ready"], 1);
        assert_eq!(json["approx_memory_mb"], 512);
        assert_eq!(json["evictions"]["memory_pressure"], 0);
    }
}
