//! Allocation accounting for memory handed to the host.
//!
//! Tables, their strings and per-handle format descriptors live outside any
//! Rust owner the host can see. These counters make their lifetime
//! observable so tests can prove rebuilds and closes release what they took.

use core::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`AllocationCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationSnapshot {
    /// Allocations made so far
    pub allocations: u64,
    /// Allocations released so far
    pub frees: u64,
    /// Bytes currently held
    pub live_bytes: u64,
}

impl AllocationSnapshot {
    /// Allocations not yet released.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.frees)
    }
}

/// Lock-free allocation counters.
///
/// All counters use `Ordering::Relaxed`: they are statistics, not
/// synchronisation.
#[derive(Debug, Default)]
pub struct AllocationCounters {
    allocations: AtomicU64,
    frees: AtomicU64,
    live_bytes: AtomicU64,
}

impl AllocationCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            live_bytes: AtomicU64::new(0),
        }
    }

    /// Records one allocation of `bytes`.
    #[inline]
    pub fn record_alloc(&self, bytes: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(widen(bytes), Ordering::Relaxed);
    }

    /// Records release of an allocation of `bytes`.
    #[inline]
    pub fn record_free(&self, bytes: usize) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        let bytes = widen(bytes);
        // Saturate rather than wrap if a caller frees more than it recorded.
        let _previous = self
            .live_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| {
                Some(live.saturating_sub(bytes))
            });
    }

    /// Current values.
    #[must_use]
    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
        }
    }
}

fn widen(bytes: usize) -> u64 {
    u64::try_from(bytes).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_free_balance() {
        let counters = AllocationCounters::new();
        counters.record_alloc(80);
        counters.record_alloc(40);
        counters.record_free(80);

        let snap = counters.snapshot();
        assert_eq!(snap.allocations, 2);
        assert_eq!(snap.frees, 1);
        assert_eq!(snap.live_bytes, 40);
        assert_eq!(snap.outstanding(), 1);
    }

    #[test]
    fn test_over_free_saturates() {
        let counters = AllocationCounters::new();
        counters.record_alloc(8);
        counters.record_free(16);
        assert_eq!(counters.snapshot().live_bytes, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let counters = std::sync::Arc::new(AllocationCounters::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counters = std::sync::Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_alloc(2);
                        counters.record_free(2);
                    }
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().is_ok());
        }
        let snap = counters.snapshot();
        assert_eq!(snap.allocations, 4000);
        assert_eq!(snap.outstanding(), 0);
        assert_eq!(snap.live_bytes, 0);
    }
}
